//! DRYDOCK Engine Boundary
//!
//! A locally hosted query engine expressed as a pluggable interpreter: every
//! named unit of work (a map-reduce stage, a move stage, a DDL command) is a
//! polymorphic [`Operation`] dispatched through an [`OperationTable`] that
//! the harness controls. The table's swap capability is the hook contract the
//! interception layer builds on - no method-body rewriting, ever.
//!
//! The engine here is deliberately minimal: enough statement classification,
//! catalog metadata, and stage plumbing to exercise parsing, planning, DDL,
//! and dispatch paths. It does not reproduce distributed execution.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod driver;
pub mod operation;
pub mod session;
pub mod stages;
pub mod table;

pub use catalog::{Catalog, TableDef};
pub use driver::{classify, split_statements, substitute_variables, StageInvocation, StatementPlan};
pub use operation::{dispatch, EngineError, EngineResult, Operation, OperationContext, WorkMeter};
pub use session::{config_keys, Session, SessionConfig, SessionState};
pub use stages::{builtin_table, names as stage_names};
pub use table::OperationTable;
