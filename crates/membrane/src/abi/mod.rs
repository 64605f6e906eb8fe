//! ABI representation layer.
//!
//! Maps each host scalar to its sandbox-side counterpart (possibly a
//! different width) and performs checked conversion in both directions. The
//! [`AbiTable`] is the single place where sandbox architecture assumptions
//! live; everything else consults it.

mod convert;
mod record;
mod table;

pub use convert::{AbiScalar, AbiValue};
pub use record::AbiRecord;
pub use table::{AbiTable, AbiType, Scalar};

pub(crate) use convert::{lower_unsigned, raise_unsigned};
