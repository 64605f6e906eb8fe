//! Error types for the membrane crate.

use thiserror::Error;

/// Boundary error type.
///
/// Every variant is recoverable and is reported synchronously to the caller
/// of the operation that detected it. Reaching the sandbox boundary with an
/// aggregate type that has no generated ABI mapping is *not* an error value:
/// there is no safe way to continue, so that path panics instead.
#[derive(Error, Debug)]
pub enum BoundaryError {
    /// A value does not fit in the destination representation during ABI
    /// lowering or raising
    #[error("conversion error: {0}")]
    Conversion(String),

    /// An address or offset translation request falls outside the sandbox heap
    #[error("bounds error: {0}")]
    Bounds(String),

    /// An operation was used outside its contract (null dereference,
    /// unaligned access, freeing a pointer the sandbox did not issue, heap
    /// relocation under fixed address mode)
    #[error("misuse: {0}")]
    Misuse(String),

    /// Sandbox memory allocation failed
    #[error("allocation error: {0}")]
    Allocation(String),

    /// The isolation backend reported a failure
    #[error("backend error: {0}")]
    Backend(String),

    /// Invalid sandbox configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for boundary operations
pub type Result<T> = std::result::Result<T, BoundaryError>;
