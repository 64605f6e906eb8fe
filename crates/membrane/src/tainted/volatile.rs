//! Live views into sandbox-writable memory.

use std::marker::PhantomData;

use super::pointer::SbxPtr;
use super::value::Tainted;
use super::RawRep;
use crate::abi::{AbiScalar, AbiTable, AbiValue};
use crate::backend::Backend;
use crate::error::Result;
use crate::mem;
use crate::sandbox::Sandbox;

/// A live view of a value inside sandbox memory.
///
/// Unlike [`Tainted`], the payload sits in memory the sandboxed component
/// can modify concurrently, so every access re-reads it and two reads may
/// observe different values. Validation must therefore go through
/// [`to_tainted`] (one whole-value copy, then the frozen copy is checked),
/// never read-check-read.
///
/// The view stores a heap offset, not a host address; the address is
/// re-derived from the live heap geometry on every access, which keeps the
/// view valid across heap relocation.
///
/// [`to_tainted`]: TaintedVolatile::to_tainted
pub struct TaintedVolatile<'sb, T: AbiScalar, B: Backend> {
    sandbox: &'sb Sandbox<B>,
    offset: u64,
    _elem: PhantomData<fn() -> T>,
}

impl<'sb, T: AbiScalar, B: Backend> TaintedVolatile<'sb, T, B> {
    pub(crate) fn new(sandbox: &'sb Sandbox<B>, offset: u64) -> Self {
        Self {
            sandbox,
            offset,
            _elem: PhantomData,
        }
    }

    // One whole-value volatile read at the current heap location. The bounds
    // check and the read use the same snapshot, so a relocation between them
    // cannot smuggle the access outside the heap.
    fn read_abi_once(&self) -> Result<AbiValue> {
        let table = self.sandbox.abi();
        let repr = table.repr_of(T::SCALAR);
        let snapshot = self.sandbox.heap_snapshot()?;
        let addr = snapshot.offset_range_to_host(self.offset, repr.size())?;
        // SAFETY: addr points at repr.size() bytes inside the mapped heap,
        // per the snapshot bounds check above.
        unsafe { mem::read_scalar(addr, repr) }
    }

    /// Copy the current value out of sandbox memory into a frozen
    /// [`Tainted`]. This is the single re-read the copy-then-validate
    /// discipline allows; everything downstream operates on the copy.
    pub fn to_tainted(&self) -> Result<Tainted<T>> {
        let table = self.sandbox.abi();
        let abi = self.read_abi_once()?;
        Ok(Tainted::new(T::from_abi(abi, table)?))
    }

    /// Escape hatch: one copy of the current value in host representation,
    /// without validation.
    pub fn unverified(&self) -> Result<T> {
        Ok(self.to_tainted()?.unverified())
    }

    /// Escape hatch: one copy of the current value in sandbox ABI
    /// representation.
    pub fn sandboxed(&self) -> Result<AbiValue> {
        self.read_abi_once()
    }

    /// Write a tainted value into sandbox memory at this location.
    pub fn write(&self, value: &Tainted<T>) -> Result<()> {
        let table = self.sandbox.abi();
        let abi = value.raw_abi(table)?;
        let snapshot = self.sandbox.heap_snapshot()?;
        let addr = snapshot.offset_range_to_host(self.offset, abi.abi_type().size())?;
        // SAFETY: addr points at abi_type().size() bytes inside the mapped
        // heap, per the snapshot bounds check above.
        unsafe { mem::write_scalar(addr, abi) }
    }

    /// Write a raw host value into sandbox memory at this location. Handing
    /// a value to the sandbox needs no verification; the ABI range check
    /// still applies.
    pub fn write_raw(&self, value: T) -> Result<()> {
        self.write(&Tainted::new(value))
    }

    /// The sandbox-relative address of this view, as a tainted pointer.
    /// Inverse of [`Tainted::<SbxPtr<T>>::deref`](Tainted::deref).
    pub fn address_of(&self) -> Tainted<SbxPtr<T>> {
        Tainted::new(SbxPtr::from_offset(self.offset))
    }
}

impl<T: AbiScalar, B: Backend> RawRep<T> for TaintedVolatile<'_, T, B> {
    fn raw_host(&self, table: &AbiTable) -> Result<T> {
        T::from_abi(self.read_abi_once()?, table)
    }

    fn raw_abi(&self, _table: &AbiTable) -> Result<AbiValue> {
        self.read_abi_once()
    }
}
