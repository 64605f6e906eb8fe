//! Offset/address translation strategies.

use serde::{Deserialize, Serialize};

use crate::error::{BoundaryError, Result};

/// Address derivation strategy for the sandbox heap.
///
/// Both modes uphold identical translation contracts; they differ only in
/// whether the heap geometry is memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddressMode {
    /// The heap may move after creation; every translation re-derives the
    /// host address from the backend's current base.
    #[default]
    Relocatable,

    /// The backend guarantees a fixed heap base for the sandbox's lifetime;
    /// the geometry is captured once at creation.
    Fixed,
}

impl AddressMode {
    /// Human-readable description of the strategy.
    pub fn description(&self) -> &'static str {
        match self {
            AddressMode::Relocatable => "relocatable heap (re-derive addresses at use)",
            AddressMode::Fixed => "fixed heap base (addresses may be memoized)",
        }
    }
}

/// One consistent view of the sandbox heap geometry.
///
/// All translations within a single logical operation must go through the
/// same snapshot so that base, size, and epoch cannot be observed mid-move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapSnapshot {
    /// Host address of the start of the heap, at the time of the snapshot.
    pub base: usize,
    /// Heap size in bytes.
    pub size: usize,
    /// Relocation epoch the snapshot was taken in.
    pub epoch: u64,
}

impl HeapSnapshot {
    /// Translate a heap-relative offset to a host address.
    pub fn offset_to_host(&self, offset: u64) -> Result<usize> {
        self.offset_range_to_host(offset, 1)
    }

    /// Translate an offset to a host address, checking that `len` bytes
    /// starting there stay inside the heap.
    pub fn offset_range_to_host(&self, offset: u64, len: usize) -> Result<usize> {
        let offset = usize::try_from(offset).map_err(|_| {
            BoundaryError::Bounds(format!("offset {offset:#x} exceeds the host address space"))
        })?;
        let end = offset.checked_add(len).ok_or_else(|| {
            BoundaryError::Bounds(format!("offset {offset:#x} + {len} overflows"))
        })?;
        if end > self.size {
            return Err(BoundaryError::Bounds(format!(
                "offset {offset:#x} + {len} bytes outside heap of {} bytes",
                self.size
            )));
        }
        Ok(self.base + offset)
    }

    /// Translate a host address back into a heap-relative offset.
    pub fn host_to_offset(&self, addr: usize) -> Result<u64> {
        if addr < self.base || addr >= self.base + self.size {
            return Err(BoundaryError::Bounds(format!(
                "host address {addr:#x} outside heap [{:#x}, {:#x})",
                self.base,
                self.base + self.size
            )));
        }
        Ok((addr - self.base) as u64)
    }
}

/// Translation strategy selected by the sandbox configuration.
///
/// `Relocatable` always uses the live geometry; `Fixed` memoizes it at
/// creation and refuses to operate if the backend relocated anyway, rather
/// than hand out an address derived from a stale base.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Translator {
    Relocatable,
    Fixed(HeapSnapshot),
}

impl Translator {
    pub(crate) fn new(mode: AddressMode, live: HeapSnapshot) -> Self {
        match mode {
            AddressMode::Relocatable => Translator::Relocatable,
            AddressMode::Fixed => Translator::Fixed(live),
        }
    }

    /// The snapshot to use for one logical operation. `live` must be freshly
    /// read from the backend.
    pub(crate) fn snapshot(&self, live: HeapSnapshot) -> Result<HeapSnapshot> {
        match self {
            Translator::Relocatable => Ok(live),
            Translator::Fixed(pinned) => {
                if pinned.epoch != live.epoch {
                    return Err(BoundaryError::Misuse(format!(
                        "backend relocated the heap (epoch {} -> {}) under fixed address mode",
                        pinned.epoch, live.epoch
                    )));
                }
                Ok(*pinned)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> HeapSnapshot {
        HeapSnapshot {
            base: 0x1000,
            size: 0x100,
            epoch: 0,
        }
    }

    #[test]
    fn test_pointer_round_trip() {
        let snap = snapshot();
        for offset in [0u64, 1, 0x80, 0xff] {
            let addr = snap.offset_to_host(offset).unwrap();
            assert_eq!(snap.host_to_offset(addr).unwrap(), offset);
        }
    }

    #[test]
    fn test_offset_out_of_bounds() {
        let snap = snapshot();
        assert!(matches!(
            snap.offset_to_host(0x100),
            Err(BoundaryError::Bounds(_))
        ));
        assert!(matches!(
            snap.offset_range_to_host(0xfd, 4),
            Err(BoundaryError::Bounds(_))
        ));
        // The same start with a shorter length is fine.
        assert!(snap.offset_range_to_host(0xfc, 4).is_ok());
    }

    #[test]
    fn test_host_address_out_of_bounds() {
        let snap = snapshot();
        assert!(snap.host_to_offset(0xfff).is_err());
        assert!(snap.host_to_offset(0x1100).is_err());
        assert_eq!(snap.host_to_offset(0x1000).unwrap(), 0);
    }

    #[test]
    fn test_relocatable_follows_live_geometry() {
        let translator = Translator::new(AddressMode::Relocatable, snapshot());
        let moved = HeapSnapshot {
            base: 0x2000,
            size: 0x100,
            epoch: 1,
        };
        let snap = translator.snapshot(moved).unwrap();
        assert_eq!(snap.base, 0x2000);
        assert_eq!(snap.epoch, 1);
    }

    #[test]
    fn test_fixed_mode_detects_relocation() {
        let translator = Translator::new(AddressMode::Fixed, snapshot());
        // Unmoved: the pinned geometry is used.
        assert_eq!(translator.snapshot(snapshot()).unwrap().base, 0x1000);

        let moved = HeapSnapshot {
            base: 0x2000,
            size: 0x100,
            epoch: 1,
        };
        assert!(matches!(
            translator.snapshot(moved),
            Err(BoundaryError::Misuse(_))
        ));
    }
}
