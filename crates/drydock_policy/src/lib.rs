//! DRYDOCK Neutralization Policy
//!
//! The fixed catalog of interceptions that turn a real engine session into a
//! dry-run prover: data-moving stages are replaced with logged no-op
//! successes, every stage dispatch is traced, concurrent stage execution is
//! forced off, and cluster-only configuration keys are renamed so scripts
//! written for the cluster do not collide with local equivalents.
//!
//! Application is best-effort per catalog entry: a stage name missing from
//! the loaded engine build is skipped with a warning, while a behavior that
//! fails to compile aborts the run.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;

pub use catalog::{
    apply, CLUSTER_CONFIG_RENAMES, DATA_MOVING_STAGES, DISPATCH_TRACE_TEMPLATE, SKIP_MESSAGE,
};
