//! Operation trait, dispatch context, and engine errors.

use crate::session::SessionState;
use crate::table::OperationTable;
use drydock_core::{HarnessError, OutputSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Engine result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Error surfaced by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Dispatch named an operation the table does not hold
    UnknownOperation {
        /// Qualified operation name
        name: String,
    },

    /// Statement did not match any plan the engine knows how to build
    UnrecognizedStatement {
        /// Offending statement text
        statement: String,
    },

    /// CREATE TABLE on a name the catalog already holds
    TableExists {
        /// Table name
        name: String,
    },

    /// Statement referenced a table the catalog does not hold
    TableMissing {
        /// Table name
        name: String,
    },

    /// Script file could not be read
    ScriptUnreadable {
        /// Script path
        path: String,
        /// What went wrong
        reason: String,
    },

    /// Filesystem error inside a stage or the catalog
    Io {
        /// What went wrong
        reason: String,
    },

    /// An installed hook behavior failed at dispatch time
    Hook {
        /// Operation the hook is attached to
        operation: String,
        /// What went wrong
        reason: String,
    },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOperation { name } => write!(f, "unknown operation: {}", name),
            Self::UnrecognizedStatement { statement } => {
                write!(f, "cannot plan statement:  {}", statement)
            }
            Self::TableExists { name } => write!(f, "table already exists: {}", name),
            Self::TableMissing { name } => write!(f, "table not found: {}", name),
            Self::ScriptUnreadable { path, reason } => {
                write!(f, "failed to find script:  {}: {}", path, reason)
            }
            Self::Io { reason } => write!(f, "io error: {}", reason),
            Self::Hook { operation, reason } => {
                write!(f, "hook on {} failed: {}", operation, reason)
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<EngineError> for HarnessError {
    fn from(err: EngineError) -> Self {
        HarnessError::Engine {
            message: err.to_string(),
        }
    }
}

/// Counter for "real work" performed by data-moving stages
///
/// Neutralization is verified against this: with cluster execution disabled,
/// the count must stay at zero for an entire run.
#[derive(Debug, Clone, Default)]
pub struct WorkMeter {
    units: Arc<AtomicU64>,
}

impl WorkMeter {
    /// Fresh meter at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one unit of real work
    pub fn record(&self) {
        self.units.fetch_add(1, Ordering::Relaxed);
    }

    /// Total units recorded so far
    #[must_use]
    pub fn units(&self) -> u64 {
        self.units.load(Ordering::Relaxed)
    }
}

/// Everything an operation body (or an installed hook) can touch
pub struct OperationContext<'a> {
    /// Qualified name of the operation being dispatched
    pub operation: String,
    /// Positional arguments; prefix hooks may rewrite these before the
    /// original body sees them
    pub args: Vec<String>,
    /// Mutable session state: config store, variables, catalog, work meter
    pub session: &'a mut SessionState,
    /// The live operation table, for operations that dispatch further
    pub table: Arc<OperationTable>,
    /// Console sink
    pub out: OutputSink,
}

impl OperationContext<'_> {
    /// Positional argument, empty string when absent
    #[must_use]
    pub fn arg(&self, index: usize) -> &str {
        self.args.get(index).map_or("", String::as_str)
    }
}

/// A named unit of work inside the engine
///
/// Implementations must not hold references into session state; everything
/// they need arrives through the context at execute time.
pub trait Operation: Send + Sync {
    /// Stable qualified name, e.g. `exec.move_stage`
    fn name(&self) -> &str;

    /// Run the operation body
    ///
    /// Returns an integer status; zero is success.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for engine-level failures; a non-zero status
    /// is an ordinary (failed) result, not an error.
    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32>;
}

/// Dispatch one named operation through the table
///
/// The operation is cloned out of the table first, so its body may look up
/// and dispatch further operations through the same table.
///
/// # Errors
///
/// Returns [`EngineError::UnknownOperation`] if the name does not resolve,
/// or whatever the operation body returns.
pub fn dispatch(
    table: &Arc<OperationTable>,
    name: &str,
    args: Vec<String>,
    session: &mut SessionState,
    out: &OutputSink,
) -> EngineResult<i32> {
    let op = table.get(name).ok_or_else(|| EngineError::UnknownOperation {
        name: name.to_string(),
    })?;

    let mut ctx = OperationContext {
        operation: name.to_string(),
        args,
        session,
        table: Arc::clone(table),
        out: out.clone(),
    };
    op.execute(&mut ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Operation for Echo {
        fn name(&self) -> &str {
            "test.echo"
        }

        fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
            ctx.out.line(ctx.arg(0));
            Ok(0)
        }
    }

    #[test]
    fn test_dispatch_runs_table_entry() {
        let table = Arc::new(OperationTable::new());
        table.register(Arc::new(Echo));
        let mut state = SessionState::new();
        let out = OutputSink::capture();

        let status = dispatch(&table, "test.echo", vec!["hi".into()], &mut state, &out).unwrap();
        assert_eq!(status, 0);
        assert_eq!(out.captured().unwrap(), "hi\n");
    }

    #[test]
    fn test_dispatch_unknown_operation() {
        let table = Arc::new(OperationTable::new());
        let mut state = SessionState::new();
        let out = OutputSink::capture();

        let err = dispatch(&table, "test.missing", Vec::new(), &mut state, &out).unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownOperation {
                name: "test.missing".to_string()
            }
        );
    }

    #[test]
    fn test_work_meter_counts() {
        let meter = WorkMeter::new();
        assert_eq!(meter.units(), 0);
        meter.record();
        meter.record();
        assert_eq!(meter.units(), 2);

        // Clones share the counter
        let clone = meter.clone();
        clone.record();
        assert_eq!(meter.units(), 3);
    }
}
