//! Sandbox-relative pointers.

use std::fmt;
use std::marker::PhantomData;

use super::value::Tainted;
use super::volatile::TaintedVolatile;
use crate::abi::{lower_unsigned, raise_unsigned, AbiScalar, AbiTable, AbiValue, Scalar};
use crate::backend::Backend;
use crate::error::{BoundaryError, Result};
use crate::sandbox::Sandbox;

/// A sandbox-relative pointer: a heap offset typed by pointee.
///
/// Inside the ABI a pointer is an unsigned offset relative to the sandbox
/// heap base, never a host address, which is what keeps pointers stable
/// across heap relocation. Offset zero is the null sandbox pointer.
pub struct SbxPtr<T> {
    offset: u64,
    _pointee: PhantomData<fn() -> T>,
}

impl<T> SbxPtr<T> {
    /// The null sandbox pointer.
    pub fn null() -> Self {
        Self::from_offset(0)
    }

    pub(crate) fn from_offset(offset: u64) -> Self {
        Self {
            offset,
            _pointee: PhantomData,
        }
    }

    /// The heap-relative offset this pointer carries.
    pub fn offset(self) -> u64 {
        self.offset
    }

    /// Whether this is the null sandbox pointer.
    pub fn is_null(self) -> bool {
        self.offset == 0
    }
}

// Manual impls: the pointee is phantom, so no bounds on T are needed.
impl<T> Clone for SbxPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SbxPtr<T> {}

impl<T> PartialEq for SbxPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<T> Eq for SbxPtr<T> {}

impl<T> fmt::Debug for SbxPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SbxPtr")
            .field("offset", &format_args!("{:#x}", self.offset))
            .finish()
    }
}

impl<T: 'static> AbiScalar for SbxPtr<T> {
    const SCALAR: Scalar = Scalar::Pointer;

    fn to_abi(self, table: &AbiTable) -> Result<AbiValue> {
        lower_unsigned(self.offset as u128, table.pointer_repr(), "sandbox pointer")
    }

    fn from_abi(value: AbiValue, table: &AbiTable) -> Result<Self> {
        let wide = raise_unsigned(value)?;
        let max = table.pointer_repr().unsigned_max().ok_or_else(|| {
            BoundaryError::Config(
                "pointer representation must be an unsigned integer".to_string(),
            )
        })?;
        if wide > max {
            return Err(BoundaryError::Conversion(format!(
                "offset {wide:#x} exceeds the sandbox pointer width"
            )));
        }
        Ok(Self::from_offset(wide as u64))
    }
}

impl<T: AbiScalar> Tainted<SbxPtr<T>> {
    /// Dereference: a live view of the pointee inside sandbox memory.
    ///
    /// Requires the owning sandbox handle to translate the offset; fails
    /// with a misuse error for the null pointer and a bounds error for an
    /// offset outside the heap. Inverse of
    /// [`TaintedVolatile::address_of`].
    pub fn deref<'sb, B: Backend>(
        &self,
        sandbox: &'sb Sandbox<B>,
    ) -> Result<TaintedVolatile<'sb, T, B>> {
        let ptr = self.raw();
        if ptr.is_null() {
            return Err(BoundaryError::Misuse(
                "dereference of null sandbox pointer".to_string(),
            ));
        }
        sandbox.volatile_view::<T>(ptr.offset())
    }

    /// Escape hatch: the host address this pointer currently resolves to.
    ///
    /// The address is derived from the live heap base and is invalidated by
    /// the next relocation; it must not be cached across operations.
    pub fn unverified_ptr<B: Backend>(&self, sandbox: &Sandbox<B>) -> Result<*mut u8> {
        let ptr = self.raw();
        if ptr.is_null() {
            return Err(BoundaryError::Misuse(
                "cannot resolve null sandbox pointer to a host address".to_string(),
            ));
        }
        Ok(sandbox.offset_to_host(ptr.offset())? as *mut u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::AbiTable;

    #[test]
    fn test_null_pointer() {
        let ptr = SbxPtr::<i32>::null();
        assert!(ptr.is_null());
        assert_eq!(ptr.offset(), 0);
    }

    #[test]
    fn test_pointer_lowers_to_configured_width() {
        let ptr = SbxPtr::<i32>::from_offset(0x40);

        let host = AbiTable::host();
        assert_eq!(ptr.to_abi(&host).unwrap(), AbiValue::U64(0x40));

        let wasm32 = AbiTable::wasm32();
        assert_eq!(ptr.to_abi(&wasm32).unwrap(), AbiValue::U32(0x40));
    }

    #[test]
    fn test_wide_offset_rejected_by_narrow_pointer() {
        let ptr = SbxPtr::<i32>::from_offset(u64::MAX);
        let wasm32 = AbiTable::wasm32();
        assert!(matches!(
            ptr.to_abi(&wasm32),
            Err(BoundaryError::Conversion(_))
        ));
    }

    #[test]
    fn test_pointer_raise_checks_width() {
        let wasm32 = AbiTable::wasm32();
        let raised = SbxPtr::<i32>::from_abi(AbiValue::U32(0x80), &wasm32).unwrap();
        assert_eq!(raised.offset(), 0x80);

        // A 64-bit value that exceeds the 32-bit sandbox pointer width.
        assert!(matches!(
            SbxPtr::<i32>::from_abi(AbiValue::U64(u64::MAX), &wasm32),
            Err(BoundaryError::Conversion(_))
        ));
    }
}
