//! DRYDOCK Interception Registry
//!
//! Installs behavior modifications onto named operations of the hosted
//! engine at runtime, without touching engine source. Three modes: a prefix
//! runs before the original body (and may rewrite its arguments), a
//! replacement substitutes the body entirely, a suffix runs after a
//! successful body with access to its status.
//!
//! Behaviors are declarative fragments compiled at install time; a fragment
//! that fails to compile for its mode is a patch failure, distinct from a
//! target that simply does not exist in the loaded engine build.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod behavior;
pub mod registry;

pub use behavior::BehaviorSpec;
pub use registry::{InterceptError, InterceptMode, InterceptRegistry};
