//! Statement planning and the stage launch path.
//!
//! Every planned stage flows through two table entries before its own body
//! runs: `driver.launch_stage` (the scheduling point) and
//! `exec.stage_dispatch` (the dispatch entry common to all operations).
//! Interceptions installed on those two names therefore observe every stage,
//! DDL and data-moving alike.

use crate::operation::{dispatch, EngineError, EngineResult, Operation, OperationContext};
use crate::stages::names;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Delimiter for batch statement splitting: a semicolon optionally
/// surrounded by whitespace and newlines
static STATEMENT_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n]*;[ \t\n]*").expect("statement delimiter regex"));

static VARIABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}").expect("variable ref regex"));

static SET_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^set\s+([^=\s]+)\s*=\s*(.*)$").expect("set assign regex")
});

static SET_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^set\s+(\S+)$").expect("set query regex"));

static CREATE_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^create\s+(?:external\s+)?(?:temporary\s+)?table\s+(if\s+not\s+exists\s+)?([A-Za-z_][\w.]*)")
        .expect("create table regex")
});

static DROP_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^drop\s+table\s+(if\s+exists\s+)?([A-Za-z_][\w.]*)")
        .expect("drop table regex")
});

static DESCRIBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(?:describe|desc)\s+(?:formatted\s+|extended\s+)?([A-Za-z_][\w.]*)")
        .expect("describe regex")
});

/// Split raw script content into non-empty statements, in file order
///
/// `"SELECT 1; ;  SELECT 2;;"` yields exactly `SELECT 1` and `SELECT 2`.
#[must_use]
pub fn split_statements(input: &str) -> Vec<&str> {
    STATEMENT_DELIMITER
        .split(input)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Expand `${name}` references from the session's variable map
///
/// Unbound references are left as written, so the engine's own error
/// reporting names them verbatim.
#[must_use]
pub fn substitute_variables(statement: &str, variables: &IndexMap<String, String>) -> String {
    VARIABLE_REF
        .replace_all(statement, |caps: &regex::Captures<'_>| {
            match variables.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// One planned stage: a qualified operation name plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInvocation {
    /// Qualified operation name
    pub operation: String,
    /// Positional arguments for the operation body
    pub args: Vec<String>,
}

impl StageInvocation {
    fn new(operation: &str, args: Vec<String>) -> Self {
        Self {
            operation: operation.to_string(),
            args,
        }
    }
}

/// How a classified statement executes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementPlan {
    /// A session command, dispatched directly (the SET path)
    Command(StageInvocation),
    /// Stages launched in order through `driver.launch_stage`
    Stages(Vec<StageInvocation>),
}

fn first_word(statement: &str) -> String {
    statement
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Classify one statement into its execution plan
///
/// This is where planning is exercised without distributed execution: queries
/// become data-moving stage sequences, DDL becomes catalog operations, SET
/// becomes a session command.
///
/// # Errors
///
/// [`EngineError::UnrecognizedStatement`] when no plan applies.
pub fn classify(statement: &str) -> EngineResult<StatementPlan> {
    if let Some(caps) = SET_ASSIGN.captures(statement) {
        return Ok(StatementPlan::Command(StageInvocation::new(
            names::SET_COMMAND,
            vec![caps[1].to_string(), caps[2].trim().to_string()],
        )));
    }
    if let Some(caps) = SET_QUERY.captures(statement) {
        return Ok(StatementPlan::Command(StageInvocation::new(
            names::SET_COMMAND,
            vec![caps[1].to_string()],
        )));
    }

    match first_word(statement).as_str() {
        "create" => {
            let caps = CREATE_TABLE.captures(statement).ok_or_else(|| {
                EngineError::UnrecognizedStatement {
                    statement: statement.to_string(),
                }
            })?;
            let mut args = vec![caps[2].to_string()];
            if caps.get(1).is_some() {
                args.push("if_not_exists".to_string());
            }
            Ok(StatementPlan::Stages(vec![StageInvocation::new(
                names::CREATE_TABLE,
                args,
            )]))
        }
        "drop" => {
            let caps = DROP_TABLE.captures(statement).ok_or_else(|| {
                EngineError::UnrecognizedStatement {
                    statement: statement.to_string(),
                }
            })?;
            let mut args = vec![caps[2].to_string()];
            if caps.get(1).is_some() {
                args.push("if_exists".to_string());
            }
            Ok(StatementPlan::Stages(vec![StageInvocation::new(
                names::DROP_TABLE,
                args,
            )]))
        }
        "describe" | "desc" => {
            let caps = DESCRIBE.captures(statement).ok_or_else(|| {
                EngineError::UnrecognizedStatement {
                    statement: statement.to_string(),
                }
            })?;
            Ok(StatementPlan::Stages(vec![StageInvocation::new(
                names::DESCRIBE,
                vec![caps[1].to_string()],
            )]))
        }
        "show" => Ok(StatementPlan::Stages(vec![StageInvocation::new(
            names::DESCRIBE,
            Vec::new(),
        )])),
        "select" | "with" => Ok(StatementPlan::Stages(vec![
            StageInvocation::new(names::MAP_REDUCE, vec![statement.to_string()]),
            StageInvocation::new(names::FETCH, vec![statement.to_string()]),
        ])),
        "insert" => Ok(StatementPlan::Stages(vec![
            StageInvocation::new(names::MAP_REDUCE, vec![statement.to_string()]),
            StageInvocation::new(names::MOVE, vec![statement.to_string()]),
            StageInvocation::new(names::STATS, vec![statement.to_string()]),
        ])),
        "load" => Ok(StatementPlan::Stages(vec![
            StageInvocation::new(names::COPY, vec![statement.to_string()]),
            StageInvocation::new(names::MOVE, vec![statement.to_string()]),
        ])),
        // USE and EXPLAIN parse and plan to nothing locally
        "use" | "explain" => Ok(StatementPlan::Stages(Vec::new())),
        _ => Err(EngineError::UnrecognizedStatement {
            statement: statement.to_string(),
        }),
    }
}

/// Scheduling point for every planned stage
///
/// The body forwards unchanged to the common dispatch entry; its value is as
/// a stable interception target observed once per stage launch.
pub struct LaunchStageOp;

impl Operation for LaunchStageOp {
    fn name(&self) -> &str {
        names::LAUNCH_STAGE
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        let args = ctx.args.clone();
        dispatch(&ctx.table, names::STAGE_DISPATCH, args, ctx.session, &ctx.out)
    }
}

/// Dispatch entry common to all stage operations
///
/// `args[0]` names the concrete stage; the remainder are its arguments.
pub struct StageDispatchOp;

impl Operation for StageDispatchOp {
    fn name(&self) -> &str {
        names::STAGE_DISPATCH
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        let target = ctx.arg(0).to_string();
        let args: Vec<String> = ctx.args.iter().skip(1).cloned().collect();
        dispatch(&ctx.table, &target, args, ctx.session, &ctx.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_drops_empty_statements() {
        let parts = split_statements("SELECT 1; ;  SELECT 2;;");
        assert_eq!(parts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_handles_newlines() {
        let parts = split_statements("CREATE TABLE t;\n\nSELECT * FROM t\n;\n");
        assert_eq!(parts, vec!["CREATE TABLE t", "SELECT * FROM t"]);
    }

    #[test]
    fn test_split_blank_content_is_empty() {
        assert!(split_statements("  ;\n ; ").is_empty());
    }

    #[test]
    fn test_variable_substitution() {
        let mut vars = IndexMap::new();
        vars.insert("DT".to_string(), "2016-01-01".to_string());
        let out = substitute_variables("SELECT * FROM t WHERE dt='${DT}'", &vars);
        assert_eq!(out, "SELECT * FROM t WHERE dt='2016-01-01'");
    }

    #[test]
    fn test_unbound_variable_left_verbatim() {
        let vars = IndexMap::new();
        let out = substitute_variables("SELECT '${MISSING}'", &vars);
        assert_eq!(out, "SELECT '${MISSING}'");
    }

    #[test]
    fn test_classify_select_plans_data_moving_stages() {
        let plan = classify("SELECT count(*) FROM events").unwrap();
        let StatementPlan::Stages(stages) = plan else {
            panic!("expected stage plan");
        };
        let ops: Vec<&str> = stages.iter().map(|s| s.operation.as_str()).collect();
        assert_eq!(ops, vec![names::MAP_REDUCE, names::FETCH]);
    }

    #[test]
    fn test_classify_insert_plans_move_and_stats() {
        let plan = classify("INSERT OVERWRITE TABLE out SELECT * FROM events").unwrap();
        let StatementPlan::Stages(stages) = plan else {
            panic!("expected stage plan");
        };
        let ops: Vec<&str> = stages.iter().map(|s| s.operation.as_str()).collect();
        assert_eq!(ops, vec![names::MAP_REDUCE, names::MOVE, names::STATS]);
    }

    #[test]
    fn test_classify_set_is_a_command() {
        let plan = classify("SET exec.parallel = true").unwrap();
        assert_eq!(
            plan,
            StatementPlan::Command(StageInvocation::new(
                names::SET_COMMAND,
                vec!["exec.parallel".to_string(), "true".to_string()]
            ))
        );
    }

    #[test]
    fn test_classify_create_table_flags() {
        let plan = classify("CREATE TABLE IF NOT EXISTS events (id INT)").unwrap();
        let StatementPlan::Stages(stages) = plan else {
            panic!("expected stage plan");
        };
        assert_eq!(stages[0].operation, names::CREATE_TABLE);
        assert_eq!(stages[0].args, vec!["events", "if_not_exists"]);
    }

    #[test]
    fn test_classify_rejects_unknown_statement() {
        assert!(matches!(
            classify("GRANT ALL TO nobody"),
            Err(EngineError::UnrecognizedStatement { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn prop_split_inverts_join(
            statements in proptest::collection::vec("[A-Za-z0-9]{1,8}( [A-Za-z0-9]{1,8}){0,2}", 0..8)
        ) {
            let joined = statements.join(";");
            let split: Vec<String> =
                split_statements(&joined).iter().map(|s| (*s).to_string()).collect();
            proptest::prop_assert_eq!(split, statements);
        }
    }
}
