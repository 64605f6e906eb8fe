//! Isolation backend contract.
//!
//! The core does not decide *how* isolation is achieved; it consumes this
//! trait. A backend might run the component in a separate process over a
//! shared-memory segment, inside a WASM runtime, or with no isolation at
//! all for tests ([`NoopBackend`]).

mod noop;

pub use noop::NoopBackend;

use crate::abi::AbiValue;
use crate::error::Result;

/// Identifier of a function callable inside the sandbox.
///
/// In the sandbox ABI a function pointer is backend-specific; this opaque
/// handle is whatever the backend hands out when the function is resolved
/// or registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef(u32);

impl FuncRef {
    /// Wrap a backend-issued function index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw function index.
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// Operations an isolation backend must supply.
///
/// Heap geometry accessors (`heap_base`, `heap_size`, `relocation_epoch`)
/// must be individually cheap; the sandbox handle reads all three as one
/// snapshot per logical operation.
pub trait Backend {
    /// Host address of the current location of the sandbox heap.
    fn heap_base(&self) -> usize;

    /// Sandbox heap size in bytes.
    fn heap_size(&self) -> usize;

    /// Counter incremented every time the heap moves. A host pointer derived
    /// in an earlier epoch must never be reused.
    fn relocation_epoch(&self) -> u64;

    /// Allocate `size` bytes of sandbox-resident memory with the given
    /// alignment, returning a heap-relative offset. Offset zero is reserved
    /// as the null sandbox pointer and is never returned.
    fn allocate(&mut self, size: usize, align: usize) -> Result<u64>;

    /// Release memory previously returned by [`Backend::allocate`].
    fn deallocate(&mut self, offset: u64) -> Result<()>;

    /// Execute a sandboxed function with ABI-representation arguments,
    /// returning its ABI-representation result (`None` for void).
    fn call(&mut self, func: FuncRef, args: &[AbiValue]) -> Result<Option<AbiValue>>;

    /// Tear down the isolated execution context and its memory. Called once
    /// when the owning sandbox handle is dropped; must be idempotent.
    fn destroy(&mut self);
}
