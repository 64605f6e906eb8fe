//! Host-owned tainted values.

use super::RawRep;
use crate::abi::{AbiRecord, AbiScalar, AbiTable, AbiValue};
use crate::error::Result;

/// A host-owned copy of a value that originated from or is destined for the
/// sandbox.
///
/// The payload is untrusted until explicitly unwrapped, but it is an
/// independent copy: unlike [`TaintedVolatile`](super::TaintedVolatile), two
/// reads of the same `Tainted` always observe the same value, which is what
/// makes copy-then-validate sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tainted<T> {
    value: T,
}

impl<T> Tainted<T> {
    /// Wrap a raw host value. By constructing a tainted value the
    /// application asserts the payload is safe to hand to the sandbox; the
    /// range checks of the ABI layer still apply on the way down.
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Copy> Tainted<T> {
    /// Raw payload, for crate-internal plumbing only.
    pub(crate) fn raw(&self) -> T {
        self.value
    }
}

impl<T> From<T> for Tainted<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: AbiScalar> Tainted<T> {
    /// Copy-convert from a tainted value of a compatible element type, e.g.
    /// widening a tainted `u16` into a tainted `u32`.
    pub fn from_tainted<S>(other: Tainted<S>) -> Self
    where
        S: AbiScalar + Into<T>,
    {
        Self::new(other.value.into())
    }

    /// Escape hatch: the value in host representation, without any
    /// validation. Calling this is an explicit admission that safety is
    /// being asserted, not checked.
    pub fn unverified(self) -> T {
        self.value
    }

    /// Escape hatch: the value lowered to the sandbox ABI representation,
    /// without validation of its meaning (the range check of the lowering
    /// itself still applies).
    pub fn sandboxed(&self, table: &AbiTable) -> Result<AbiValue> {
        self.value.to_abi(table)
    }

    /// Unwrap through an application-supplied verifier. The closure receives
    /// a frozen copy, so the value it validates is the value the caller
    /// gets.
    pub fn copy_and_verify<U, F>(self, verify: F) -> Result<U>
    where
        F: FnOnce(T) -> Result<U>,
    {
        verify(self.value)
    }
}

impl<T: AbiRecord> Tainted<T> {
    /// Escape hatch for aggregates: the field list in sandbox ABI
    /// representation. Panics for aggregate types without a generated
    /// mapping (see [`AbiRecord`]); field-by-field extraction is only
    /// defined once the sandbox-side layout has been established.
    pub fn sandboxed_fields(&self, table: &AbiTable) -> Result<Vec<AbiValue>> {
        self.value.to_abi_fields(table)
    }
}

impl<T: AbiScalar> RawRep<T> for Tainted<T> {
    fn raw_host(&self, _table: &AbiTable) -> Result<T> {
        Ok(self.value)
    }

    fn raw_abi(&self, table: &AbiTable) -> Result<AbiValue> {
        self.value.to_abi(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{AbiType, Scalar};
    use crate::error::BoundaryError;

    #[test]
    fn test_construction_and_unverified() {
        let value = Tainted::new(12i32);
        assert_eq!(value.unverified(), 12);

        let from: Tainted<i32> = 7.into();
        assert_eq!(from.unverified(), 7);
    }

    #[test]
    fn test_from_tainted_widens() {
        let narrow = Tainted::new(300u16);
        let wide = Tainted::<u32>::from_tainted(narrow);
        assert_eq!(wide.unverified(), 300);
    }

    #[test]
    fn test_sandboxed_applies_range_check() {
        let table = AbiTable::host()
            .with_repr(Scalar::U64, AbiType::U32)
            .unwrap();
        let fits = Tainted::new(17u64);
        assert_eq!(fits.sandboxed(&table).unwrap(), AbiValue::U32(17));

        let too_big = Tainted::new(u64::MAX);
        assert!(matches!(
            too_big.sandboxed(&table),
            Err(BoundaryError::Conversion(_))
        ));
    }

    #[test]
    fn test_copy_and_verify() {
        let value = Tainted::new(200i32);
        let verified = value.copy_and_verify(|v| {
            if (0..=255).contains(&v) {
                Ok(v as u8)
            } else {
                Err(BoundaryError::Conversion("out of byte range".to_string()))
            }
        });
        assert_eq!(verified.unwrap(), 200);

        let rejected = Tainted::new(-1i32).copy_and_verify(|v| {
            if v >= 0 {
                Ok(v)
            } else {
                Err(BoundaryError::Conversion("negative".to_string()))
            }
        });
        assert!(rejected.is_err());
    }
}
