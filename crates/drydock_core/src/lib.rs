//! DRYDOCK Core Types
//!
//! Shared pieces of the dry-run proving harness: the error taxonomy every
//! crate converges into, and the console sink that carries the user-facing
//! output contract.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod sink;

// Re-exports
pub use error::{HarnessError, HarnessResult};
pub use sink::OutputSink;
