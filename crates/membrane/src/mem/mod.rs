//! Address translation between sandbox-relative offsets and host pointers.
//!
//! Offsets are stable across heap relocation; host addresses are valid only
//! for the current heap location. Translation always goes through a
//! [`HeapSnapshot`], one consistent read of base, size, and epoch per
//! logical operation.

mod translate;

pub use translate::{AddressMode, HeapSnapshot};

pub(crate) use translate::Translator;

use crate::abi::{AbiType, AbiValue};
use crate::error::{BoundaryError, Result};

/// Single whole-value volatile read of a sandbox scalar.
///
/// The read is never torn: the full representation is loaded in one access,
/// which is what makes a frozen copy meaningful under concurrent sandbox
/// writes. Unaligned locations are a reported misuse, not a partial read.
///
/// # Safety
///
/// `addr` must point at least `repr.size()` bytes into live, readable
/// sandbox memory (bounds-checked by the caller against a heap snapshot).
pub(crate) unsafe fn read_scalar(addr: usize, repr: AbiType) -> Result<AbiValue> {
    check_aligned(addr, repr)?;
    let value = match repr {
        AbiType::I8 => AbiValue::I8(std::ptr::read_volatile(addr as *const i8)),
        AbiType::U8 => AbiValue::U8(std::ptr::read_volatile(addr as *const u8)),
        AbiType::I16 => AbiValue::I16(std::ptr::read_volatile(addr as *const i16)),
        AbiType::U16 => AbiValue::U16(std::ptr::read_volatile(addr as *const u16)),
        AbiType::I32 => AbiValue::I32(std::ptr::read_volatile(addr as *const i32)),
        AbiType::U32 => AbiValue::U32(std::ptr::read_volatile(addr as *const u32)),
        AbiType::I64 => AbiValue::I64(std::ptr::read_volatile(addr as *const i64)),
        AbiType::U64 => AbiValue::U64(std::ptr::read_volatile(addr as *const u64)),
        AbiType::F32 => AbiValue::F32(std::ptr::read_volatile(addr as *const f32)),
        AbiType::F64 => AbiValue::F64(std::ptr::read_volatile(addr as *const f64)),
    };
    Ok(value)
}

/// Single whole-value volatile write of a sandbox scalar.
///
/// # Safety
///
/// `addr` must point at least `value.abi_type().size()` bytes into live,
/// writable sandbox memory (bounds-checked by the caller against a heap
/// snapshot).
pub(crate) unsafe fn write_scalar(addr: usize, value: AbiValue) -> Result<()> {
    check_aligned(addr, value.abi_type())?;
    match value {
        AbiValue::I8(v) => std::ptr::write_volatile(addr as *mut i8, v),
        AbiValue::U8(v) => std::ptr::write_volatile(addr as *mut u8, v),
        AbiValue::I16(v) => std::ptr::write_volatile(addr as *mut i16, v),
        AbiValue::U16(v) => std::ptr::write_volatile(addr as *mut u16, v),
        AbiValue::I32(v) => std::ptr::write_volatile(addr as *mut i32, v),
        AbiValue::U32(v) => std::ptr::write_volatile(addr as *mut u32, v),
        AbiValue::I64(v) => std::ptr::write_volatile(addr as *mut i64, v),
        AbiValue::U64(v) => std::ptr::write_volatile(addr as *mut u64, v),
        AbiValue::F32(v) => std::ptr::write_volatile(addr as *mut f32, v),
        AbiValue::F64(v) => std::ptr::write_volatile(addr as *mut f64, v),
    }
    Ok(())
}

fn check_aligned(addr: usize, repr: AbiType) -> Result<()> {
    if addr % repr.align() != 0 {
        return Err(BoundaryError::Misuse(format!(
            "unaligned {repr:?} access at {addr:#x}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_read_write() {
        let mut storage = [0u64; 1];
        let addr = storage.as_mut_ptr() as usize;

        unsafe {
            write_scalar(addr, AbiValue::I32(-77)).unwrap();
            assert_eq!(read_scalar(addr, AbiType::I32).unwrap(), AbiValue::I32(-77));

            write_scalar(addr, AbiValue::U64(u64::MAX)).unwrap();
            assert_eq!(
                read_scalar(addr, AbiType::U64).unwrap(),
                AbiValue::U64(u64::MAX)
            );
        }
    }

    #[test]
    fn test_unaligned_access_is_misuse() {
        let mut storage = [0u64; 2];
        let base = storage.as_mut_ptr() as usize;
        // u64 storage guarantees base is 8-aligned, so base + 1 is not.
        let result = unsafe { read_scalar(base + 1, AbiType::U32) };
        assert!(matches!(result, Err(BoundaryError::Misuse(_))));

        let result = unsafe { write_scalar(base + 2, AbiValue::U64(1)) };
        assert!(matches!(result, Err(BoundaryError::Misuse(_))));
    }
}
