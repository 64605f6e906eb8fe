//! The sandbox handle.

use crate::abi::{AbiScalar, AbiTable};
use crate::backend::{Backend, FuncRef};
use crate::call::{lower_args, SandboxArg};
use crate::config::SandboxConfig;
use crate::error::{BoundaryError, Result};
use crate::mem::{HeapSnapshot, Translator};
use crate::tainted::{SbxPtr, Tainted, TaintedVolatile};

/// Owning handle for one isolated component instance.
///
/// Every boundary crossing goes through this handle: sandbox memory
/// allocation, address translation, and function invocation. Results come
/// back wrapped in [`Tainted`]; arguments are marshaled through the
/// configured ABI table with range checks in both directions.
pub struct Sandbox<B: Backend> {
    backend: B,
    config: SandboxConfig,
    translator: Translator,
}

impl<B: Backend> Sandbox<B> {
    /// Create a sandbox over an already-initialized backend.
    pub fn new(backend: B, config: SandboxConfig) -> Result<Self> {
        config.validate()?;
        let live = Self::live_snapshot(&backend);
        let translator = Translator::new(config.address_mode, live);
        tracing::debug!(
            mode = config.address_mode.description(),
            heap_base = format_args!("{:#x}", live.base),
            heap_size = live.size,
            "sandbox created"
        );
        Ok(Self {
            backend,
            config,
            translator,
        })
    }

    /// The ABI table values cross the boundary through.
    pub fn abi(&self) -> &AbiTable {
        &self.config.abi
    }

    /// The configuration this sandbox was created with.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the underlying backend, e.g. to register functions
    /// or drive backend-specific hooks.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn live_snapshot(backend: &B) -> HeapSnapshot {
        HeapSnapshot {
            base: backend.heap_base(),
            size: backend.heap_size(),
            epoch: backend.relocation_epoch(),
        }
    }

    /// One consistent view of the heap geometry for a logical operation.
    ///
    /// Under fixed address mode this fails if the backend relocated anyway.
    pub fn heap_snapshot(&self) -> Result<HeapSnapshot> {
        self.translator.snapshot(Self::live_snapshot(&self.backend))
    }

    /// Translate a heap-relative offset to a host address, valid only until
    /// the next relocation.
    pub fn offset_to_host(&self, offset: u64) -> Result<usize> {
        self.heap_snapshot()?.offset_to_host(offset)
    }

    /// Translate a host address inside the heap back to a stable offset.
    pub fn host_to_offset(&self, addr: usize) -> Result<u64> {
        self.heap_snapshot()?.host_to_offset(addr)
    }

    /// Allocate sandbox memory for `count` elements of `T`'s sandbox
    /// representation, returning a tainted pointer to the first element.
    pub fn alloc<T: AbiScalar>(&mut self, count: usize) -> Result<Tainted<SbxPtr<T>>> {
        if count == 0 {
            return Err(BoundaryError::Allocation(
                "zero-element allocation".to_string(),
            ));
        }
        let repr = self.config.abi.repr_of(T::SCALAR);
        let size = repr.size().checked_mul(count).ok_or_else(|| {
            BoundaryError::Allocation(format!("{count} elements of {repr:?} overflow"))
        })?;
        let offset = self.backend.allocate(size, repr.align())?;
        tracing::trace!(
            offset = format_args!("{offset:#x}"),
            size,
            "sandbox allocation"
        );
        Ok(Tainted::new(SbxPtr::from_offset(offset)))
    }

    /// Release sandbox memory previously returned by [`Sandbox::alloc`].
    pub fn free<T: AbiScalar>(&mut self, ptr: Tainted<SbxPtr<T>>) -> Result<()> {
        let ptr = ptr.unverified();
        if ptr.is_null() {
            return Err(BoundaryError::Misuse(
                "free of null sandbox pointer".to_string(),
            ));
        }
        self.backend.deallocate(ptr.offset())
    }

    // Bounds are checked against the current geometry up front so misuse is
    // reported at view creation; the view re-derives the address on every
    // access anyway.
    pub(crate) fn volatile_view<T: AbiScalar>(
        &self,
        offset: u64,
    ) -> Result<TaintedVolatile<'_, T, B>> {
        let repr = self.config.abi.repr_of(T::SCALAR);
        self.heap_snapshot()?
            .offset_range_to_host(offset, repr.size())?;
        Ok(TaintedVolatile::new(self, offset))
    }

    /// Invoke a sandboxed function and raise its result as a tainted value.
    ///
    /// Arguments may mix raw host scalars, tainted values, and sandbox
    /// pointers; each is lowered through the ABI table before the call.
    pub fn invoke<R: AbiScalar>(
        &mut self,
        func: FuncRef,
        args: &[&dyn SandboxArg],
    ) -> Result<Tainted<R>> {
        let lowered = lower_args(&self.config.abi, args)?;
        tracing::trace!(func = func.index(), args = lowered.len(), "sandbox call");
        let ret = self.backend.call(func, &lowered)?.ok_or_else(|| {
            BoundaryError::Backend(format!(
                "sandbox function {} returned no value",
                func.index()
            ))
        })?;
        Ok(Tainted::new(R::from_abi(ret, &self.config.abi)?))
    }

    /// Invoke a sandboxed function for its side effects, discarding any
    /// returned value.
    pub fn invoke_void(&mut self, func: FuncRef, args: &[&dyn SandboxArg]) -> Result<()> {
        let lowered = lower_args(&self.config.abi, args)?;
        tracing::trace!(func = func.index(), args = lowered.len(), "sandbox call");
        self.backend.call(func, &lowered)?;
        Ok(())
    }
}

impl<B: Backend> Drop for Sandbox<B> {
    fn drop(&mut self) {
        self.backend.destroy();
        tracing::debug!("sandbox destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{AbiValue, Scalar};
    use crate::backend::NoopBackend;

    fn sandbox() -> Sandbox<NoopBackend> {
        Sandbox::new(NoopBackend::new(4096).unwrap(), SandboxConfig::host()).unwrap()
    }

    #[test]
    fn test_alloc_and_free() {
        let mut sb = sandbox();
        let ptr = sb.alloc::<i32>(4).unwrap();
        assert!(!ptr.unverified().is_null());
        sb.free(ptr).unwrap();
        assert!(matches!(sb.free(ptr), Err(BoundaryError::Misuse(_))));
    }

    #[test]
    fn test_alloc_zero_elements_rejected() {
        let mut sb = sandbox();
        assert!(matches!(
            sb.alloc::<i32>(0),
            Err(BoundaryError::Allocation(_))
        ));
    }

    #[test]
    fn test_free_null_is_misuse() {
        let mut sb = sandbox();
        let null = Tainted::new(SbxPtr::<i32>::null());
        assert!(matches!(sb.free(null), Err(BoundaryError::Misuse(_))));
    }

    #[test]
    fn test_deref_write_read() {
        let mut sb = sandbox();
        let ptr = sb.alloc::<u32>(1).unwrap();
        let view = ptr.deref(&sb).unwrap();
        view.write_raw(0xabcd).unwrap();
        assert_eq!(view.unverified().unwrap(), 0xabcd);
        assert_eq!(view.address_of(), ptr);
    }

    #[test]
    fn test_null_deref_is_misuse() {
        let sb = sandbox();
        let null = Tainted::new(SbxPtr::<u32>::null());
        assert!(matches!(null.deref(&sb), Err(BoundaryError::Misuse(_))));
    }

    #[test]
    fn test_invoke_returns_tainted() {
        let mut sb = sandbox();
        let add = sb.backend_mut().register(|_heap, args| {
            let (AbiValue::I32(a), AbiValue::I32(b)) = (args[0], args[1]) else {
                return Err(BoundaryError::Backend("expected two i32".to_string()));
            };
            Ok(Some(AbiValue::I32(a + b)))
        });

        let sum: Tainted<i32> = sb.invoke(add, &[&5i32, &7i32]).unwrap();
        assert_eq!(sum.unverified(), 12);
    }

    #[test]
    fn test_invoke_argument_error_reported_before_call() {
        let config = SandboxConfig::host().abi(
            crate::abi::AbiTable::host()
                .with_repr(Scalar::U64, crate::abi::AbiType::U32)
                .unwrap(),
        );
        let mut sb = Sandbox::new(NoopBackend::new(4096).unwrap(), config).unwrap();
        let called = sb
            .backend_mut()
            .register(|_heap, _args| Err(BoundaryError::Backend("must not run".to_string())));

        let result: Result<Tainted<u32>> = sb.invoke(called, &[&u64::MAX]);
        assert!(matches!(result, Err(BoundaryError::Conversion(_))));
    }

    #[test]
    fn test_invoke_void_discards_result() {
        let mut sb = sandbox();
        let f = sb
            .backend_mut()
            .register(|_heap, _args| Ok(Some(AbiValue::I32(1))));
        sb.invoke_void(f, &[]).unwrap();
    }
}
