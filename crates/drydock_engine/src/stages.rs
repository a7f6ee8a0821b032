//! Builtin operations registered by the local engine.

use crate::driver::{LaunchStageOp, StageDispatchOp};
use crate::operation::{EngineResult, Operation, OperationContext};
use crate::table::OperationTable;
use std::sync::Arc;

/// Qualified names of the engine's builtin operations
pub mod names {
    /// Scheduling point every planned stage passes through
    pub const LAUNCH_STAGE: &str = "driver.launch_stage";
    /// Dispatch entry common to all stage operations
    pub const STAGE_DISPATCH: &str = "exec.stage_dispatch";

    /// Distributed map-reduce execution stage
    pub const MAP_REDUCE: &str = "exec.map_reduce_stage";
    /// Local-mode map-reduce execution stage
    pub const LOCAL_MAP_REDUCE: &str = "exec.local_map_reduce_stage";
    /// Data movement stage
    pub const MOVE: &str = "exec.move_stage";
    /// Result fetch stage
    pub const FETCH: &str = "exec.fetch_stage";
    /// Data copy stage
    pub const COPY: &str = "exec.copy_stage";
    /// Small-file merge stage
    pub const MERGE: &str = "exec.merge_stage";
    /// Statistics gathering stage
    pub const STATS: &str = "exec.stats_stage";

    /// Catalog table creation
    pub const CREATE_TABLE: &str = "ddl.create_table";
    /// Catalog table removal
    pub const DROP_TABLE: &str = "ddl.drop_table";
    /// Catalog metadata listing
    pub const DESCRIBE: &str = "ddl.describe";

    /// Configuration-set command path
    pub const SET_COMMAND: &str = "session.set_command";
}

/// Data-moving stage: the heavy work a dry run exists to avoid
///
/// The real body only records a unit of work on the session's meter; even
/// that is enough to prove neutralization replaced it.
struct DataMovingStage {
    name: &'static str,
}

impl Operation for DataMovingStage {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        ctx.session.work.record();
        tracing::debug!(stage = self.name, "executed data-moving stage body");
        Ok(0)
    }
}

struct CreateTableOp;

impl Operation for CreateTableOp {
    fn name(&self) -> &str {
        names::CREATE_TABLE
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        let name = ctx.arg(0).to_string();
        let if_not_exists = ctx.args.iter().any(|a| a == "if_not_exists");
        ctx.session.catalog.create_table(&name, if_not_exists)?;
        Ok(0)
    }
}

struct DropTableOp;

impl Operation for DropTableOp {
    fn name(&self) -> &str {
        names::DROP_TABLE
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        let name = ctx.arg(0).to_string();
        let if_exists = ctx.args.iter().any(|a| a == "if_exists");
        ctx.session.catalog.drop_table(&name, if_exists)?;
        Ok(0)
    }
}

struct DescribeOp;

impl Operation for DescribeOp {
    fn name(&self) -> &str {
        names::DESCRIBE
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        if ctx.args.is_empty() {
            // SHOW TABLES
            for name in ctx.session.catalog.table_names() {
                ctx.out.line(&name);
            }
            return Ok(0);
        }

        let name = ctx.arg(0).to_string();
        match ctx.session.catalog.table(&name) {
            Some(def) => {
                let location = def
                    .location
                    .as_ref()
                    .map_or_else(String::new, |p| format!("  {}", p.display()));
                ctx.out.line(&format!("{}{}", def.name, location));
                Ok(0)
            }
            None => Err(crate::operation::EngineError::TableMissing { name }),
        }
    }
}

/// Configuration-set command path
///
/// `args[0]` is the key, `args[1]` (when present) the value. A bare key
/// echoes the stored value. Prefix interceptions rewrite cluster-only key
/// names here before they reach the store.
struct SetCommandOp;

impl Operation for SetCommandOp {
    fn name(&self) -> &str {
        names::SET_COMMAND
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        match ctx.args.len() {
            0 => Ok(0),
            1 => {
                let key = ctx.arg(0);
                match ctx.session.config.get(key) {
                    Some(value) => ctx.out.line(&format!("{}={}", key, value)),
                    None => ctx.out.line(&format!("{} is undefined", key)),
                }
                Ok(0)
            }
            _ => {
                let key = ctx.arg(0).to_string();
                let value = ctx.arg(1).to_string();
                ctx.session.config.insert(key, value);
                Ok(0)
            }
        }
    }
}

/// Fresh table holding the full builtin operation set
#[must_use]
pub fn builtin_table() -> Arc<OperationTable> {
    let table = OperationTable::new();

    table.register(Arc::new(LaunchStageOp));
    table.register(Arc::new(StageDispatchOp));

    for name in [
        names::MAP_REDUCE,
        names::LOCAL_MAP_REDUCE,
        names::MOVE,
        names::FETCH,
        names::COPY,
        names::MERGE,
        names::STATS,
    ] {
        table.register(Arc::new(DataMovingStage { name }));
    }

    table.register(Arc::new(CreateTableOp));
    table.register(Arc::new(DropTableOp));
    table.register(Arc::new(DescribeOp));
    table.register(Arc::new(SetCommandOp));

    Arc::new(table)
}
