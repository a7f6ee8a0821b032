//! Engine session: one per process, all tasks reuse it.

use crate::catalog::Catalog;
use crate::driver::{classify, split_statements, substitute_variables, StatementPlan};
use crate::operation::{dispatch, EngineError, EngineResult, WorkMeter};
use crate::stages::names;
use crate::table::OperationTable;
use drydock_core::OutputSink;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration keys the harness wires into the workspace
pub mod config_keys {
    /// Metastore connection location
    pub const METASTORE_CONNECT_URL: &str = "metastore.connect_url";
    /// Warehouse directory backing the catalog
    pub const METASTORE_WAREHOUSE_DIR: &str = "metastore.warehouse_dir";
    /// Scratch space for stage intermediates
    pub const EXEC_SCRATCH_DIR: &str = "exec.scratch_dir";
    /// Node-local scratch space
    pub const EXEC_LOCAL_SCRATCH_DIR: &str = "exec.local_scratch_dir";
    /// Statement history location
    pub const SESSION_HISTORY_DIR: &str = "session.history_dir";
    /// Concurrent stage execution flag; the neutralization policy forces
    /// this false at every stage launch
    pub const EXEC_PARALLEL: &str = "exec.parallel";
}

/// Mutable state shared by every operation dispatched in a session
#[derive(Debug)]
pub struct SessionState {
    /// Configuration store, insertion-ordered
    pub config: IndexMap<String, String>,
    /// Variable bindings for the current task
    pub variables: IndexMap<String, String>,
    /// Local metadata store
    pub catalog: Catalog,
    /// Real-work counter for data-moving stages
    pub work: WorkMeter,
    /// Auxiliary library bundles registered with the session
    pub resources: Vec<PathBuf>,
}

impl SessionState {
    /// Empty state
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: IndexMap::new(),
            variables: IndexMap::new(),
            catalog: Catalog::new(),
            work: WorkMeter::new(),
            resources: Vec::new(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Session construction parameters
///
/// Explicit configuration passed at construction time; the session never
/// mutates hidden globals.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    entries: IndexMap<String, String>,
    verbose: bool,
}

impl SessionConfig {
    /// Empty config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one configuration entry
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Echo each statement before execution
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// A single engine session bound to an operation table
///
/// Exactly one exists per process; the orchestrator owns it and all tasks
/// reuse it.
pub struct Session {
    state: SessionState,
    table: Arc<OperationTable>,
    out: OutputSink,
    verbose: bool,
}

impl Session {
    /// Build a session over the given operation table
    #[must_use]
    pub fn new(config: SessionConfig, table: Arc<OperationTable>, out: OutputSink) -> Self {
        let mut state = SessionState::new();
        if let Some(dir) = config.entries.get(config_keys::METASTORE_WAREHOUSE_DIR) {
            state.catalog.set_warehouse_dir(PathBuf::from(dir));
        }
        state.config = config.entries;

        Self {
            state,
            table,
            out,
            verbose: config.verbose,
        }
    }

    /// The session's operation table handle
    #[must_use]
    pub fn table(&self) -> Arc<OperationTable> {
        Arc::clone(&self.table)
    }

    /// Read access to session state
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle to the real-work meter
    #[must_use]
    pub fn work_meter(&self) -> WorkMeter {
        self.state.work.clone()
    }

    /// Replace the session's variable map
    ///
    /// Bindings are task-local: the orchestrator calls this once per task, so
    /// nothing leaks from one task into the next.
    pub fn set_variables(&mut self, variables: IndexMap<String, String>) {
        self.state.variables = variables;
    }

    /// Register an auxiliary library bundle with the session runtime
    ///
    /// Paths are validated by the manifest loader before they reach here.
    pub fn register_resource(&mut self, path: PathBuf) {
        tracing::debug!(path = %path.display(), "registered auxiliary library");
        self.state.resources.push(path);
    }

    /// Submit one statement
    ///
    /// # Errors
    ///
    /// Engine-level errors (unplannable statement, missing table, failed
    /// hook) propagate; a non-zero stage status is returned as the
    /// statement's status, with remaining stages skipped.
    pub fn process_statement(&mut self, statement: &str) -> EngineResult<i32> {
        let statement = statement.trim();
        if statement.is_empty() {
            return Ok(0);
        }

        let expanded = substitute_variables(statement, &self.state.variables);
        match classify(&expanded)? {
            StatementPlan::Command(command) => dispatch(
                &self.table,
                &command.operation,
                command.args,
                &mut self.state,
                &self.out,
            ),
            StatementPlan::Stages(stages) => {
                for stage in stages {
                    let mut args = vec![stage.operation];
                    args.extend(stage.args);
                    let status = dispatch(
                        &self.table,
                        names::LAUNCH_STAGE,
                        args,
                        &mut self.state,
                        &self.out,
                    )?;
                    if status != 0 {
                        return Ok(status);
                    }
                }
                Ok(0)
            }
        }
    }

    /// Submit a whole script file: the process-file entry point
    ///
    /// Statements run in file order; the first failure stops the file and
    /// becomes its status. One integer status covers the whole file.
    ///
    /// # Errors
    ///
    /// [`EngineError::ScriptUnreadable`] when the file cannot be read.
    /// Statement-level engine errors do not propagate from here; they are
    /// printed and folded into a non-zero file status.
    pub fn process_file(&mut self, path: &Path) -> EngineResult<i32> {
        let raw = fs::read_to_string(path).map_err(|err| EngineError::ScriptUnreadable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        for statement in split_statements(&raw) {
            if self.verbose {
                self.out.blank();
                self.out.line(statement);
            }
            match self.process_statement(statement) {
                Ok(0) => {}
                Ok(status) => return Ok(status),
                Err(err) => {
                    self.out.line(&format!("FAILED: {}", err));
                    return Ok(1);
                }
            }
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::builtin_table;
    use std::io::Write;

    fn test_session() -> (Session, OutputSink) {
        let out = OutputSink::capture();
        let session = Session::new(SessionConfig::new(), builtin_table(), out.clone());
        (session, out)
    }

    #[test]
    fn test_ddl_does_not_record_work() {
        let (mut session, _out) = test_session();
        let status = session.process_statement("CREATE TABLE events (id INT)").unwrap();
        assert_eq!(status, 0);
        assert_eq!(session.work_meter().units(), 0);
        assert!(session.state().catalog.table("events").is_some());
    }

    #[test]
    fn test_select_records_work_when_unpatched() {
        let (mut session, _out) = test_session();
        session.process_statement("SELECT 1").unwrap();
        // map-reduce stage plus fetch stage
        assert_eq!(session.work_meter().units(), 2);
    }

    #[test]
    fn test_variables_substituted_into_statements() {
        let (mut session, _out) = test_session();
        let mut vars = IndexMap::new();
        vars.insert("TBL".to_string(), "events".to_string());
        session.set_variables(vars);
        session.process_statement("CREATE TABLE ${TBL} (id INT)").unwrap();
        assert!(session.state().catalog.table("events").is_some());
    }

    #[test]
    fn test_set_variables_replaces_previous_bindings() {
        let (mut session, _out) = test_session();
        let mut first = IndexMap::new();
        first.insert("A".to_string(), "1".to_string());
        session.set_variables(first);

        let mut second = IndexMap::new();
        second.insert("B".to_string(), "2".to_string());
        session.set_variables(second);

        assert!(!session.state().variables.contains_key("A"));
        assert_eq!(session.state().variables.get("B").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_process_file_returns_one_status() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        script
            .write_all(b"CREATE TABLE t (id INT);\nDESCRIBE t;\n")
            .unwrap();
        let (mut session, _out) = test_session();
        assert_eq!(session.process_file(script.path()).unwrap(), 0);
    }

    #[test]
    fn test_process_file_stops_at_first_failure() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        script
            .write_all(b"DESCRIBE missing_table;\nCREATE TABLE after (id INT);\n")
            .unwrap();
        let (mut session, out) = test_session();
        let status = session.process_file(script.path()).unwrap();
        assert_ne!(status, 0);
        assert!(out.captured().unwrap().contains("FAILED:"));
        assert!(session.state().catalog.table("after").is_none());
    }

    #[test]
    fn test_process_file_missing_script_errors() {
        let (mut session, _out) = test_session();
        assert!(matches!(
            session.process_file(Path::new("/no/such/script.q")),
            Err(EngineError::ScriptUnreadable { .. })
        ));
    }

    #[test]
    fn test_verbose_echoes_statements() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        script.write_all(b"SHOW TABLES;").unwrap();
        let out = OutputSink::capture();
        let mut session = Session::new(
            SessionConfig::new().with_verbose(true),
            builtin_table(),
            out.clone(),
        );
        session.process_file(script.path()).unwrap();
        assert!(out.captured().unwrap().contains("SHOW TABLES"));
    }

    #[test]
    fn test_warehouse_dir_seeds_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let out = OutputSink::capture();
        let mut session = Session::new(
            SessionConfig::new().with_entry(
                config_keys::METASTORE_WAREHOUSE_DIR,
                dir.path().display().to_string(),
            ),
            builtin_table(),
            out,
        );
        session.process_statement("CREATE TABLE t (id INT)").unwrap();
        assert!(dir.path().join("t").is_dir());
    }
}
