//! Checked conversion between host scalars and sandbox ABI values.
//!
//! Lowering (host -> sandbox) and raising (sandbox -> host) are both
//! range-checked; an out-of-range value is a reported conversion error in
//! either direction, never a silent truncation or wrap.

use super::table::{AbiTable, AbiType, Scalar};
use crate::error::{BoundaryError, Result};

/// One scalar in the sandbox ABI representation.
///
/// The tagged-variant set is closed: it is the complete list of shapes a
/// value can have on the sandbox side of the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbiValue {
    /// 8-bit signed integer
    I8(i8),
    /// 8-bit unsigned integer
    U8(u8),
    /// 16-bit signed integer
    I16(i16),
    /// 16-bit unsigned integer
    U16(u16),
    /// 32-bit signed integer
    I32(i32),
    /// 32-bit unsigned integer
    U32(u32),
    /// 64-bit signed integer
    I64(i64),
    /// 64-bit unsigned integer
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
}

impl AbiValue {
    /// The representation this value is carried in.
    pub fn abi_type(&self) -> AbiType {
        match self {
            AbiValue::I8(_) => AbiType::I8,
            AbiValue::U8(_) => AbiType::U8,
            AbiValue::I16(_) => AbiType::I16,
            AbiValue::U16(_) => AbiType::U16,
            AbiValue::I32(_) => AbiType::I32,
            AbiValue::U32(_) => AbiType::U32,
            AbiValue::I64(_) => AbiType::I64,
            AbiValue::U64(_) => AbiType::U64,
            AbiValue::F32(_) => AbiType::F32,
            AbiValue::F64(_) => AbiType::F64,
        }
    }
}

/// Host scalar types with a sandbox ABI mapping.
///
/// Conversion is value-preserving for values within the sandbox
/// representation's range; anything else is a conversion error.
pub trait AbiScalar: Copy + std::fmt::Debug + 'static {
    /// Category used to key the ABI table.
    const SCALAR: Scalar;

    /// Lower into the sandbox representation selected by `table`.
    fn to_abi(self, table: &AbiTable) -> Result<AbiValue>;

    /// Raise from a sandbox value, failing if it cannot be represented in
    /// `Self` (relevant when the sandbox representation is wider).
    fn from_abi(value: AbiValue, table: &AbiTable) -> Result<Self>;
}

pub(crate) fn lower_signed(value: i128, target: AbiType, what: &str) -> Result<AbiValue> {
    let out_of_range = || {
        BoundaryError::Conversion(format!(
            "{what} value {value} does not fit in sandbox representation {target:?}"
        ))
    };
    match target {
        AbiType::I8 => i8::try_from(value).map(AbiValue::I8).map_err(|_| out_of_range()),
        AbiType::U8 => u8::try_from(value).map(AbiValue::U8).map_err(|_| out_of_range()),
        AbiType::I16 => i16::try_from(value).map(AbiValue::I16).map_err(|_| out_of_range()),
        AbiType::U16 => u16::try_from(value).map(AbiValue::U16).map_err(|_| out_of_range()),
        AbiType::I32 => i32::try_from(value).map(AbiValue::I32).map_err(|_| out_of_range()),
        AbiType::U32 => u32::try_from(value).map(AbiValue::U32).map_err(|_| out_of_range()),
        AbiType::I64 => i64::try_from(value).map(AbiValue::I64).map_err(|_| out_of_range()),
        AbiType::U64 => u64::try_from(value).map(AbiValue::U64).map_err(|_| out_of_range()),
        AbiType::F32 | AbiType::F64 => Err(BoundaryError::Conversion(format!(
            "{what} is an integer but is mapped to float representation {target:?}"
        ))),
    }
}

pub(crate) fn lower_unsigned(value: u128, target: AbiType, what: &str) -> Result<AbiValue> {
    let wide = i128::try_from(value).map_err(|_| {
        BoundaryError::Conversion(format!("{what} value {value} exceeds the lowering range"))
    })?;
    lower_signed(wide, target, what)
}

fn lower_float(value: f64, target: AbiType, what: &str) -> Result<AbiValue> {
    match target {
        AbiType::F64 => Ok(AbiValue::F64(value)),
        AbiType::F32 => {
            let narrowed = value as f32;
            if narrowed.is_infinite() && value.is_finite() {
                return Err(BoundaryError::Conversion(format!(
                    "{what} value {value} overflows sandbox representation F32"
                )));
            }
            Ok(AbiValue::F32(narrowed))
        }
        _ => Err(BoundaryError::Conversion(format!(
            "{what} is a float but is mapped to integer representation {target:?}"
        ))),
    }
}

/// Widen any integer ABI value to `i128`; floats are rejected.
pub(crate) fn raise_signed(value: AbiValue) -> Result<i128> {
    match value {
        AbiValue::I8(v) => Ok(v as i128),
        AbiValue::U8(v) => Ok(v as i128),
        AbiValue::I16(v) => Ok(v as i128),
        AbiValue::U16(v) => Ok(v as i128),
        AbiValue::I32(v) => Ok(v as i128),
        AbiValue::U32(v) => Ok(v as i128),
        AbiValue::I64(v) => Ok(v as i128),
        AbiValue::U64(v) => Ok(v as i128),
        AbiValue::F32(_) | AbiValue::F64(_) => Err(BoundaryError::Conversion(
            "float ABI value where an integer was expected".to_string(),
        )),
    }
}

/// Widen any integer ABI value to `u128`; negatives and floats are rejected.
pub(crate) fn raise_unsigned(value: AbiValue) -> Result<u128> {
    let wide = raise_signed(value)?;
    u128::try_from(wide).map_err(|_| {
        BoundaryError::Conversion(format!(
            "negative ABI value {wide} where an unsigned integer was expected"
        ))
    })
}

fn raise_float(value: AbiValue) -> Result<f64> {
    match value {
        AbiValue::F32(v) => Ok(v as f64),
        AbiValue::F64(v) => Ok(v),
        _ => Err(BoundaryError::Conversion(
            "integer ABI value where a float was expected".to_string(),
        )),
    }
}

macro_rules! impl_abi_signed {
    ($($t:ty => $scalar:ident),+ $(,)?) => {$(
        impl AbiScalar for $t {
            const SCALAR: Scalar = Scalar::$scalar;

            fn to_abi(self, table: &AbiTable) -> Result<AbiValue> {
                lower_signed(self as i128, table.repr_of(Self::SCALAR), stringify!($t))
            }

            fn from_abi(value: AbiValue, _table: &AbiTable) -> Result<Self> {
                let wide = raise_signed(value)?;
                <$t>::try_from(wide).map_err(|_| BoundaryError::Conversion(format!(
                    "ABI value {} does not fit in host {}", wide, stringify!($t)
                )))
            }
        }
    )+};
}

macro_rules! impl_abi_unsigned {
    ($($t:ty => $scalar:ident),+ $(,)?) => {$(
        impl AbiScalar for $t {
            const SCALAR: Scalar = Scalar::$scalar;

            fn to_abi(self, table: &AbiTable) -> Result<AbiValue> {
                lower_unsigned(self as u128, table.repr_of(Self::SCALAR), stringify!($t))
            }

            fn from_abi(value: AbiValue, _table: &AbiTable) -> Result<Self> {
                let wide = raise_unsigned(value)?;
                <$t>::try_from(wide).map_err(|_| BoundaryError::Conversion(format!(
                    "ABI value {} does not fit in host {}", wide, stringify!($t)
                )))
            }
        }
    )+};
}

impl_abi_signed!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);
impl_abi_unsigned!(u8 => U8, u16 => U16, u32 => U32, u64 => U64);

impl AbiScalar for f32 {
    const SCALAR: Scalar = Scalar::F32;

    fn to_abi(self, table: &AbiTable) -> Result<AbiValue> {
        lower_float(self as f64, table.repr_of(Self::SCALAR), "f32")
    }

    fn from_abi(value: AbiValue, _table: &AbiTable) -> Result<Self> {
        let wide = raise_float(value)?;
        let narrowed = wide as f32;
        if narrowed.is_infinite() && wide.is_finite() {
            return Err(BoundaryError::Conversion(format!(
                "ABI value {wide} overflows host f32"
            )));
        }
        Ok(narrowed)
    }
}

impl AbiScalar for f64 {
    const SCALAR: Scalar = Scalar::F64;

    fn to_abi(self, table: &AbiTable) -> Result<AbiValue> {
        lower_float(self, table.repr_of(Self::SCALAR), "f64")
    }

    fn from_abi(value: AbiValue, _table: &AbiTable) -> Result<Self> {
        raise_float(value)
    }
}

impl AbiScalar for bool {
    const SCALAR: Scalar = Scalar::Bool;

    fn to_abi(self, table: &AbiTable) -> Result<AbiValue> {
        lower_unsigned(self as u128, table.repr_of(Self::SCALAR), "bool")
    }

    // C truthiness: any nonzero integer raises to true.
    fn from_abi(value: AbiValue, _table: &AbiTable) -> Result<Self> {
        Ok(raise_signed(value)? != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_identity_table() {
        let table = AbiTable::host();
        assert_eq!(i32::from_abi(12i32.to_abi(&table).unwrap(), &table).unwrap(), 12);
        assert_eq!(i64::from_abi((-9i64).to_abi(&table).unwrap(), &table).unwrap(), -9);
        assert_eq!(u8::from_abi(255u8.to_abi(&table).unwrap(), &table).unwrap(), 255);
        assert_eq!(u16::from_abi(7u16.to_abi(&table).unwrap(), &table).unwrap(), 7);
        assert_eq!(u64::from_abi(u64::MAX.to_abi(&table).unwrap(), &table).unwrap(), u64::MAX);
        assert_eq!(f32::from_abi(1.5f32.to_abi(&table).unwrap(), &table).unwrap(), 1.5);
        assert_eq!(f64::from_abi(2.25f64.to_abi(&table).unwrap(), &table).unwrap(), 2.25);
        assert!(bool::from_abi(true.to_abi(&table).unwrap(), &table).unwrap());
        assert!(!bool::from_abi(false.to_abi(&table).unwrap(), &table).unwrap());
    }

    #[test]
    fn test_lowering_rejects_out_of_range() {
        // Sandbox maps u64 to a 32-bit representation.
        let table = AbiTable::host()
            .with_repr(Scalar::U64, AbiType::U32)
            .unwrap();

        let in_range = (u32::MAX as u64).to_abi(&table).unwrap();
        assert_eq!(in_range, AbiValue::U32(u32::MAX));

        let result = (u32::MAX as u64 + 1).to_abi(&table);
        assert!(matches!(result, Err(BoundaryError::Conversion(_))));
    }

    #[test]
    fn test_raising_rejects_wider_value() {
        let table = AbiTable::host();
        // A 64-bit sandbox ABI feeding a 32-bit host type.
        let result = i32::from_abi(AbiValue::I64(i64::MAX), &table);
        assert!(matches!(result, Err(BoundaryError::Conversion(_))));

        // In-range values pass.
        assert_eq!(i32::from_abi(AbiValue::I64(41), &table).unwrap(), 41);
    }

    #[test]
    fn test_raising_rejects_negative_into_unsigned() {
        let table = AbiTable::host();
        let result = u32::from_abi(AbiValue::I32(-1), &table);
        assert!(matches!(result, Err(BoundaryError::Conversion(_))));
    }

    #[test]
    fn test_float_integer_mismatch() {
        let table = AbiTable::host();
        assert!(i32::from_abi(AbiValue::F64(1.0), &table).is_err());
        assert!(f64::from_abi(AbiValue::I32(1), &table).is_err());
    }

    #[test]
    fn test_f32_overflow_detected() {
        let table = AbiTable::host();
        let result = f32::from_abi(AbiValue::F64(f64::MAX), &table);
        assert!(matches!(result, Err(BoundaryError::Conversion(_))));
        // Infinity is passed through, only finite overflow is an error.
        assert!(f32::from_abi(AbiValue::F64(f64::INFINITY), &table)
            .unwrap()
            .is_infinite());
    }

    #[test]
    fn test_bool_truthiness() {
        let table = AbiTable::host();
        assert!(bool::from_abi(AbiValue::U8(2), &table).unwrap());
        assert!(bool::from_abi(AbiValue::I32(-1), &table).unwrap());
        assert!(!bool::from_abi(AbiValue::U8(0), &table).unwrap());
    }
}
