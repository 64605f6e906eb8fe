//! The tainted value family.
//!
//! Everything that crosses the sandbox boundary is wrapped: [`Tainted`] is a
//! host-owned untrusted copy, [`TaintedVolatile`] is a live view into
//! sandbox-writable memory. The only ways out of a wrapper are the
//! explicitly named escape operations; nothing else in the API bypasses
//! them.

mod pointer;
mod value;
mod volatile;

pub use pointer::SbxPtr;
pub use value::Tainted;
pub use volatile::TaintedVolatile;

use crate::abi::{AbiScalar, AbiTable, AbiValue};
use crate::error::Result;

/// Privileged cross-wrapper access to raw representations.
///
/// Conversions between the wrapper variants need to read each other's raw
/// storage. This trait is the only such path and stays crate-internal so the
/// trust boundary cannot be bypassed from outside the module that owns it.
pub(crate) trait RawRep<T: AbiScalar> {
    /// Raw value in host representation.
    fn raw_host(&self, table: &AbiTable) -> Result<T>;

    /// Raw value in sandbox ABI representation.
    fn raw_abi(&self, table: &AbiTable) -> Result<AbiValue>;
}
