//! Aggregate (struct-like) ABI mappings.
//!
//! Field-by-field layout in the sandbox ABI cannot be derived automatically:
//! the sandbox-side compiler's layout rules may differ from the host's. A
//! mapping is therefore generated per concrete type with [`abi_record!`];
//! any aggregate that reaches the boundary without one hits the fatal
//! default path.

use super::convert::AbiValue;
use super::table::AbiTable;
use crate::error::Result;

/// Aggregate types crossing the sandbox boundary.
///
/// The default method bodies are the "unsupported aggregate" path: they
/// panic, because there is no safe way to marshal a type whose sandbox-side
/// layout has not been established. Generated impls (see [`abi_record!`])
/// replace both methods with field-by-field conversion.
pub trait AbiRecord: Copy + 'static {
    /// Lower every field into its sandbox representation, in declaration
    /// order.
    fn to_abi_fields(&self, table: &AbiTable) -> Result<Vec<AbiValue>> {
        let _ = table;
        unsupported_record::<Self>()
    }

    /// Raise a field list back into the host type.
    fn from_abi_fields(fields: &[AbiValue], table: &AbiTable) -> Result<Self> {
        let _ = (fields, table);
        unsupported_record::<Self>()
    }
}

/// Fatal: an aggregate reached the boundary without a generated ABI mapping.
/// This is an integration defect, not a recoverable condition.
pub(crate) fn unsupported_record<T: ?Sized>() -> ! {
    panic!(
        "no generated sandbox ABI mapping for aggregate type {}",
        std::any::type_name::<T>()
    )
}

/// Generate an [`AbiRecord`] impl for a struct, field by field.
///
/// Stands in for per-type codegen: the field list must mirror the
/// sandbox-side layout (order included), which is why it is written out
/// explicitly rather than derived.
///
/// ```rust,ignore
/// #[derive(Clone, Copy)]
/// struct Point { x: i32, y: i32 }
///
/// abi_record!(Point { x: i32, y: i32 });
/// ```
#[macro_export]
macro_rules! abi_record {
    ($ty:ty { $($field:ident : $fty:ty),+ $(,)? }) => {
        impl $crate::abi::AbiRecord for $ty {
            fn to_abi_fields(
                &self,
                table: &$crate::abi::AbiTable,
            ) -> $crate::error::Result<Vec<$crate::abi::AbiValue>> {
                let mut fields = Vec::new();
                $(
                    fields.push(<$fty as $crate::abi::AbiScalar>::to_abi(self.$field, table)?);
                )+
                Ok(fields)
            }

            fn from_abi_fields(
                fields: &[$crate::abi::AbiValue],
                table: &$crate::abi::AbiTable,
            ) -> $crate::error::Result<Self> {
                let expected = [$(stringify!($field)),+].len();
                if fields.len() != expected {
                    return Err($crate::error::BoundaryError::Conversion(format!(
                        "expected {} fields for {}, got {}",
                        expected,
                        std::any::type_name::<$ty>(),
                        fields.len()
                    )));
                }
                let mut next = fields.iter().copied();
                Ok(Self {
                    $(
                        $field: match next.next() {
                            Some(value) => {
                                <$fty as $crate::abi::AbiScalar>::from_abi(value, table)?
                            }
                            None => {
                                return Err($crate::error::BoundaryError::Conversion(
                                    format!(
                                        "missing field {} for {}",
                                        stringify!($field),
                                        std::any::type_name::<$ty>()
                                    ),
                                ))
                            }
                        },
                    )+
                })
            }
        }
    };
}
