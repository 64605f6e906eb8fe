//! No-isolation backend for development and tests.
//!
//! "Sandboxed functions" are host closures that receive the current heap and
//! the lowered argument list, the same view a real guest would have. The
//! heap is plain process memory, so this backend isolates nothing; it exists
//! to exercise the trust-boundary machinery, including a [`relocate`]
//! test hook that moves the heap and bumps the relocation epoch.
//!
//! [`relocate`]: NoopBackend::relocate

use std::alloc::{alloc_zeroed, dealloc, Layout};

use super::{Backend, FuncRef};
use crate::abi::AbiValue;
use crate::error::{BoundaryError, Result};

/// Host closure standing in for a sandboxed function.
pub type HostFn = Box<dyn FnMut(&mut [u8], &[AbiValue]) -> Result<Option<AbiValue>>>;

// Offset zero is reserved as the null sandbox pointer.
const HEAP_RESERVED: usize = 16;
const HEAP_ALIGN: usize = 16;

struct Block {
    offset: u64,
    free: bool,
}

/// In-process backend with a movable heap and a host-closure function
/// registry.
pub struct NoopBackend {
    heap: *mut u8,
    size: usize,
    next: usize,
    epoch: u64,
    blocks: Vec<Block>,
    functions: Vec<HostFn>,
    destroyed: bool,
}

impl NoopBackend {
    /// Create a backend with a heap of `size` bytes.
    pub fn new(size: usize) -> Result<Self> {
        if size <= HEAP_RESERVED {
            return Err(BoundaryError::Config(format!(
                "heap size {size} is below the reserved minimum of {HEAP_RESERVED} bytes"
            )));
        }
        let heap = Self::map_heap(size)?;
        tracing::debug!(size, "noop backend heap mapped");
        Ok(Self {
            heap,
            size,
            next: HEAP_RESERVED,
            epoch: 0,
            blocks: Vec::new(),
            functions: Vec::new(),
            destroyed: false,
        })
    }

    /// Register a host closure as a callable "sandboxed" function.
    pub fn register<F>(&mut self, func: F) -> FuncRef
    where
        F: FnMut(&mut [u8], &[AbiValue]) -> Result<Option<AbiValue>> + 'static,
    {
        self.functions.push(Box::new(func));
        FuncRef::new((self.functions.len() - 1) as u32)
    }

    /// Test hook: move the heap to a new host location, preserving its
    /// contents, and increment the relocation epoch.
    pub fn relocate(&mut self) -> Result<()> {
        let new_heap = Self::map_heap(self.size)?;
        // The new region is mapped before the old one is released, so the
        // base address is guaranteed to change.
        unsafe {
            std::ptr::copy_nonoverlapping(self.heap, new_heap, self.size);
            dealloc(self.heap, Self::layout(self.size));
        }
        self.heap = new_heap;
        self.epoch += 1;
        tracing::debug!(epoch = self.epoch, "noop backend heap relocated");
        Ok(())
    }

    fn layout(size: usize) -> Layout {
        // Size and alignment were validated in `new`.
        Layout::from_size_align(size, HEAP_ALIGN).unwrap_or_else(|_| Layout::new::<u8>())
    }

    fn map_heap(size: usize) -> Result<*mut u8> {
        let layout = Layout::from_size_align(size, HEAP_ALIGN)
            .map_err(|e| BoundaryError::Config(format!("bad heap layout: {e}")))?;
        // SAFETY: layout has nonzero size (checked in `new`).
        let heap = unsafe { alloc_zeroed(layout) };
        if heap.is_null() {
            return Err(BoundaryError::Allocation(format!(
                "failed to map {size} byte heap"
            )));
        }
        Ok(heap)
    }

    fn align_up(value: usize, align: usize) -> usize {
        (value + align - 1) & !(align - 1)
    }
}

impl Backend for NoopBackend {
    fn heap_base(&self) -> usize {
        self.heap as usize
    }

    fn heap_size(&self) -> usize {
        self.size
    }

    fn relocation_epoch(&self) -> u64 {
        self.epoch
    }

    // Bump allocation with free-tracking. Freed blocks are not reused: the
    // component's internal heap policy is out of scope, and tests only need
    // issued-pointer bookkeeping.
    fn allocate(&mut self, size: usize, align: usize) -> Result<u64> {
        if size == 0 {
            return Err(BoundaryError::Allocation(
                "zero-length allocation".to_string(),
            ));
        }
        if align == 0 || !align.is_power_of_two() || align > HEAP_ALIGN {
            return Err(BoundaryError::Allocation(format!(
                "unsupported alignment {align} (must be a power of two up to {HEAP_ALIGN})"
            )));
        }
        // The heap base is HEAP_ALIGN-aligned, so an aligned offset yields an
        // aligned host address.
        let offset = Self::align_up(self.next, align);
        let end = offset.checked_add(size).ok_or_else(|| {
            BoundaryError::Allocation(format!("allocation of {size} bytes overflows"))
        })?;
        if end > self.size {
            return Err(BoundaryError::Allocation(format!(
                "allocation of {size} bytes exhausts the {} byte heap",
                self.size
            )));
        }
        self.next = end;
        let offset = offset as u64;
        self.blocks.push(Block {
            offset,
            free: false,
        });
        Ok(offset)
    }

    fn deallocate(&mut self, offset: u64) -> Result<()> {
        match self.blocks.iter_mut().find(|b| b.offset == offset) {
            Some(block) if !block.free => {
                block.free = true;
                Ok(())
            }
            Some(_) => Err(BoundaryError::Misuse(format!(
                "double free of sandbox offset {offset:#x}"
            ))),
            None => Err(BoundaryError::Misuse(format!(
                "sandbox offset {offset:#x} was not issued by this backend"
            ))),
        }
    }

    fn call(&mut self, func: FuncRef, args: &[AbiValue]) -> Result<Option<AbiValue>> {
        // SAFETY: the heap stays mapped for the duration of the call; the
        // slice is rebuilt from the raw pointer so it does not alias any
        // other borrow of self.
        let heap = unsafe { std::slice::from_raw_parts_mut(self.heap, self.size) };
        let handler = self
            .functions
            .get_mut(func.index() as usize)
            .ok_or_else(|| {
                BoundaryError::Backend(format!("unknown sandbox function {}", func.index()))
            })?;
        handler(heap, args)
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.functions.clear();
        // SAFETY: heap was mapped in `new`/`relocate` with the same layout
        // and has not been released yet.
        unsafe { dealloc(self.heap, Self::layout(self.size)) };
        tracing::debug!("noop backend destroyed");
    }
}

impl Drop for NoopBackend {
    fn drop(&mut self) {
        self.destroy();
    }
}
