//! Argument marshaling for sandboxed calls.

use crate::abi::{AbiScalar, AbiTable, AbiValue};
use crate::error::{BoundaryError, Result};
use crate::tainted::{SbxPtr, Tainted};

/// Anything that can be passed as an argument to a sandboxed function.
///
/// Implemented for raw host scalars, for [`SbxPtr`], and for [`Tainted`]
/// wrappers of either; a call site can mix raw and tainted arguments
/// freely. Raw and tainted arguments take the same lowering path, so the
/// ABI range checks apply to both.
pub trait SandboxArg {
    /// Lower this argument to its sandbox ABI representation.
    fn lower(&self, table: &AbiTable) -> Result<AbiValue>;
}

macro_rules! impl_raw_arg {
    ($($t:ty),+ $(,)?) => {$(
        impl SandboxArg for $t {
            fn lower(&self, table: &AbiTable) -> Result<AbiValue> {
                Tainted::new(*self).sandboxed(table)
            }
        }
    )+};
}

impl_raw_arg!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, bool);

impl<T: 'static> SandboxArg for SbxPtr<T> {
    fn lower(&self, table: &AbiTable) -> Result<AbiValue> {
        self.to_abi(table)
    }
}

impl<T: AbiScalar> SandboxArg for Tainted<T> {
    fn lower(&self, table: &AbiTable) -> Result<AbiValue> {
        self.sandboxed(table)
    }
}

/// Lower a full argument list, attributing failures to their position.
pub(crate) fn lower_args(table: &AbiTable, args: &[&dyn SandboxArg]) -> Result<Vec<AbiValue>> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| {
            arg.lower(table)
                .map_err(|e| BoundaryError::Conversion(format!("argument {index}: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{AbiTable, AbiType, Scalar};

    #[test]
    fn test_raw_and_tainted_lower_identically() {
        let table = AbiTable::host();
        let raw = 9i32.lower(&table).unwrap();
        let tainted = Tainted::new(9i32).lower(&table).unwrap();
        assert_eq!(raw, tainted);
        assert_eq!(raw, AbiValue::I32(9));
    }

    #[test]
    fn test_pointer_argument_uses_pointer_repr() {
        let table = AbiTable::wasm32();
        let ptr = SbxPtr::<u8>::null();
        assert_eq!(ptr.lower(&table).unwrap(), AbiValue::U32(0));
    }

    #[test]
    fn test_lower_args_reports_position() {
        let table = AbiTable::host()
            .with_repr(Scalar::U64, AbiType::U32)
            .unwrap();
        let bad = u64::MAX;
        let err = lower_args(&table, &[&1i32, &bad]).unwrap_err();
        let BoundaryError::Conversion(msg) = err else {
            panic!("expected conversion error");
        };
        assert!(msg.starts_with("argument 1:"), "{msg}");
    }
}
