//! # Membrane
//!
//! Trust-boundary enforcement for host applications embedding untrusted,
//! isolated components.
//!
//! The component runs behind a pluggable [`Backend`] with its own heap and
//! possibly its own data model (e.g. a 32-bit guest inside a 64-bit host).
//! Every value crossing the boundary is wrapped, every conversion is
//! range-checked through a per-sandbox ABI table, and sandbox pointers are
//! heap-relative offsets that survive heap relocation.
//!
//! ## Wrappers
//!
//! | Wrapper | Holds | Hazard |
//! |---------|-------|--------|
//! | [`Tainted`] | Host-owned copy of an untrusted value | Untrusted until verified; stable across reads |
//! | [`TaintedVolatile`] | Live view into sandbox memory | Sandbox can rewrite it between reads; copy first |
//! | [`Tainted<SbxPtr<T>>`](SbxPtr) | Heap-relative pointer | Only meaningful through the owning [`Sandbox`] |
//!
//! The only ways to unwrap are the explicitly named escape operations
//! (`unverified`, `sandboxed`) and the checked [`Tainted::copy_and_verify`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use membrane::{NoopBackend, Sandbox, SandboxConfig, Tainted};
//!
//! let mut backend = NoopBackend::new(64 * 1024)?;
//! let add = backend.register(|_heap, args| { /* guest code */ });
//!
//! let mut sandbox = Sandbox::new(backend, SandboxConfig::wasm32())?;
//! let sum: Tainted<i32> = sandbox.invoke(add, &[&5i32, &7i32])?;
//! let sum = sum.copy_and_verify(|v| Ok(v))?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod abi;
pub mod backend;
pub mod call;
pub mod config;
pub mod error;
pub mod mem;
pub mod sandbox;
pub mod tainted;

// Re-export main types
pub use abi::{AbiRecord, AbiScalar, AbiTable, AbiType, AbiValue, Scalar};
pub use backend::{Backend, FuncRef, NoopBackend};
pub use call::SandboxArg;
pub use config::SandboxConfig;
pub use error::{BoundaryError, Result};
pub use mem::{AddressMode, HeapSnapshot};
pub use sandbox::Sandbox;
pub use tainted::{SbxPtr, Tainted, TaintedVolatile};
