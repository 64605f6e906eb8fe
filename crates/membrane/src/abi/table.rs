//! The per-sandbox ABI description table.
//!
//! This table is the only place sandbox architecture assumptions are encoded
//! (e.g. a 32-bit pointer sandbox embedded in a 64-bit host). It is produced
//! once per target sandbox configuration and consulted by every conversion.

use serde::{Deserialize, Serialize};

use crate::error::{BoundaryError, Result};

/// Host-side scalar categories with a sandbox ABI mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scalar {
    /// 8-bit signed integer
    I8,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit signed integer
    I16,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit signed integer
    I32,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit signed integer
    I64,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Boolean (crosses the boundary as an unsigned integer)
    Bool,
    /// Sandbox-relative pointer (always an unsigned offset in the ABI)
    Pointer,
}

impl Scalar {
    pub(crate) const COUNT: usize = 12;

    /// All scalar categories, in table order.
    pub const ALL: [Scalar; Scalar::COUNT] = [
        Scalar::I8,
        Scalar::U8,
        Scalar::I16,
        Scalar::U16,
        Scalar::I32,
        Scalar::U32,
        Scalar::I64,
        Scalar::U64,
        Scalar::F32,
        Scalar::F64,
        Scalar::Bool,
        Scalar::Pointer,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Sandbox-side scalar representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbiType {
    /// 8-bit signed integer
    I8,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit signed integer
    I16,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit signed integer
    I32,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit signed integer
    I64,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
}

impl AbiType {
    /// Width of this representation in bytes.
    pub fn size(self) -> usize {
        match self {
            AbiType::I8 | AbiType::U8 => 1,
            AbiType::I16 | AbiType::U16 => 2,
            AbiType::I32 | AbiType::U32 | AbiType::F32 => 4,
            AbiType::I64 | AbiType::U64 | AbiType::F64 => 8,
        }
    }

    /// Required alignment in bytes (natural alignment).
    pub fn align(self) -> usize {
        self.size()
    }

    /// Whether this is a signed integer representation.
    pub fn is_signed_int(self) -> bool {
        matches!(self, AbiType::I8 | AbiType::I16 | AbiType::I32 | AbiType::I64)
    }

    /// Whether this is an unsigned integer representation.
    pub fn is_unsigned_int(self) -> bool {
        matches!(self, AbiType::U8 | AbiType::U16 | AbiType::U32 | AbiType::U64)
    }

    /// Whether this is a floating point representation.
    pub fn is_float(self) -> bool {
        matches!(self, AbiType::F32 | AbiType::F64)
    }

    /// Largest value representable when this is an unsigned integer.
    pub(crate) fn unsigned_max(self) -> Option<u128> {
        match self {
            AbiType::U8 => Some(u8::MAX as u128),
            AbiType::U16 => Some(u16::MAX as u128),
            AbiType::U32 => Some(u32::MAX as u128),
            AbiType::U64 => Some(u64::MAX as u128),
            _ => None,
        }
    }
}

/// The `Scalar -> AbiType` mapping for one sandbox configuration.
///
/// Overrides must keep the signedness/float class of the scalar; widths may
/// differ in either direction. A narrower sandbox representation turns
/// out-of-range lowering into a reported conversion error, and a wider one
/// turns out-of-range raising into the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiTable {
    reprs: [AbiType; Scalar::COUNT],
}

// Indexed by Scalar discriminant.
const IDENTITY: [AbiType; Scalar::COUNT] = [
    AbiType::I8,
    AbiType::U8,
    AbiType::I16,
    AbiType::U16,
    AbiType::I32,
    AbiType::U32,
    AbiType::I64,
    AbiType::U64,
    AbiType::F32,
    AbiType::F64,
    AbiType::U8,  // bool
    AbiType::U64, // pointer
];

impl AbiTable {
    /// Identity mapping with 64-bit pointers. Suitable for a backend that
    /// shares the host's data model.
    pub fn host() -> Self {
        Self { reprs: IDENTITY }
    }

    /// Identity mapping with 32-bit pointers, the data model of a wasm32
    /// guest embedded in a 64-bit host.
    pub fn wasm32() -> Self {
        let mut reprs = IDENTITY;
        reprs[Scalar::Pointer.index()] = AbiType::U32;
        Self { reprs }
    }

    /// Builder: override the representation of one scalar category.
    ///
    /// Fails with a configuration error if the override changes the
    /// signedness/float class; an unsupported mapping must be rejected here
    /// rather than silently degrade at conversion time.
    pub fn with_repr(mut self, scalar: Scalar, repr: AbiType) -> Result<Self> {
        if !Self::compatible(scalar, repr) {
            return Err(BoundaryError::Config(format!(
                "{scalar:?} cannot be represented as {repr:?}"
            )));
        }
        self.reprs[scalar.index()] = repr;
        Ok(self)
    }

    /// The sandbox representation of a scalar category.
    pub fn repr_of(&self, scalar: Scalar) -> AbiType {
        self.reprs[scalar.index()]
    }

    /// The sandbox pointer representation (always an unsigned integer).
    pub fn pointer_repr(&self) -> AbiType {
        self.repr_of(Scalar::Pointer)
    }

    /// Check every mapping. Needed after deserialization, which bypasses
    /// `with_repr`.
    pub fn validate(&self) -> Result<()> {
        for scalar in Scalar::ALL {
            let repr = self.repr_of(scalar);
            if !Self::compatible(scalar, repr) {
                return Err(BoundaryError::Config(format!(
                    "{scalar:?} cannot be represented as {repr:?}"
                )));
            }
        }
        Ok(())
    }

    fn compatible(scalar: Scalar, repr: AbiType) -> bool {
        match scalar {
            Scalar::I8 | Scalar::I16 | Scalar::I32 | Scalar::I64 => repr.is_signed_int(),
            Scalar::U8 | Scalar::U16 | Scalar::U32 | Scalar::U64 => repr.is_unsigned_int(),
            Scalar::F32 | Scalar::F64 => repr.is_float(),
            Scalar::Bool | Scalar::Pointer => repr.is_unsigned_int(),
        }
    }
}

impl Default for AbiTable {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_table_identity() {
        let table = AbiTable::host();
        assert_eq!(table.repr_of(Scalar::I32), AbiType::I32);
        assert_eq!(table.repr_of(Scalar::U64), AbiType::U64);
        assert_eq!(table.pointer_repr(), AbiType::U64);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_wasm32_pointer_width() {
        let table = AbiTable::wasm32();
        assert_eq!(table.pointer_repr(), AbiType::U32);
        assert_eq!(table.pointer_repr().size(), 4);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_narrowing_override() {
        let table = AbiTable::host()
            .with_repr(Scalar::U64, AbiType::U32)
            .unwrap();
        assert_eq!(table.repr_of(Scalar::U64), AbiType::U32);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_class_mismatch_rejected() {
        let result = AbiTable::host().with_repr(Scalar::I32, AbiType::U32);
        assert!(matches!(result, Err(BoundaryError::Config(_))));

        let result = AbiTable::host().with_repr(Scalar::F32, AbiType::I32);
        assert!(matches!(result, Err(BoundaryError::Config(_))));

        let result = AbiTable::host().with_repr(Scalar::Pointer, AbiType::I64);
        assert!(matches!(result, Err(BoundaryError::Config(_))));
    }

    #[test]
    fn test_widening_override() {
        // A 64-bit sandbox ABI feeding a 32-bit host type is legal; the
        // range check moves to the raising direction.
        let table = AbiTable::host()
            .with_repr(Scalar::I32, AbiType::I64)
            .unwrap();
        assert_eq!(table.repr_of(Scalar::I32), AbiType::I64);
    }
}
