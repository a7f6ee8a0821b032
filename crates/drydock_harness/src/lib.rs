//! DRYDOCK Harness
//!
//! Ties the pieces together: the bootstrapper builds a fresh, isolated
//! workspace and one patched engine session; the orchestrator walks the
//! manifest's tasks in order, binds per-task variables, submits each script,
//! and aborts the whole run on the first failure.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod environment;
pub mod orchestrator;

pub use environment::{ExecutionEnvironment, WORKSPACE_DIR_NAME};
pub use orchestrator::{Orchestrator, RunReport, RunState};
