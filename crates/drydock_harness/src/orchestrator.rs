//! Script orchestrator: the manifest's task loop.

use crate::environment::ExecutionEnvironment;
use drydock_core::{HarnessError, HarnessResult, OutputSink};
use drydock_engine::split_statements;
use drydock_manifest::{EngineKind, Task, TaskManifest};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Orchestrator lifecycle
///
/// Any failure transitions straight to `Failed`; there is no resume or
/// retry - the workspace is wiped again on the next invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// `run` has not been called
    NotStarted,
    /// Workspace and session are bootstrapped
    EnvironmentReady,
    /// A task is executing
    RunningTask,
    /// All tasks completed
    Done,
    /// A fatal error unwound the run
    Failed,
}

/// Summary of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks executed (equals the manifest's task count on success)
    pub tasks_run: usize,
    /// Total wall-clock time
    pub elapsed: Duration,
}

/// Sequences manifest tasks against one patched engine session
///
/// Purely sequential: one task at a time, one statement at a time, each
/// submission fully complete before the next begins.
pub struct Orchestrator {
    manifest: TaskManifest,
    environment: ExecutionEnvironment,
    out: OutputSink,
    state: RunState,
}

impl Orchestrator {
    /// Orchestrator over a manifest, with the workspace under the given root
    #[must_use]
    pub fn new(manifest: TaskManifest, workspace_root: impl Into<std::path::PathBuf>, out: OutputSink) -> Self {
        let environment = ExecutionEnvironment::new(workspace_root, out.clone())
            .with_verbose(manifest.verbose)
            .with_neutralization(!manifest.cluster_execution)
            .with_aux_libraries(manifest.aux_libraries.clone());

        Self {
            manifest,
            environment,
            out,
            state: RunState::NotStarted,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The execution environment, mostly for inspection
    #[must_use]
    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }

    /// Run every task in manifest order
    ///
    /// # Errors
    ///
    /// The first fatal condition aborts the run: environment bootstrap
    /// failures, policy patch failures, and script failures
    /// ([`HarnessError::ScriptExecution`], naming the offending script). No
    /// further tasks execute after a failure.
    pub fn run(&mut self) -> HarnessResult<RunReport> {
        let start = Instant::now();

        if self.manifest.debug {
            self.out.line("Manifest contents:");
            self.out.line(&self.manifest.raw_document);
            self.out.blank();
        }

        match self.run_tasks() {
            Ok(tasks_run) => {
                self.state = RunState::Done;
                Ok(RunReport {
                    tasks_run,
                    elapsed: start.elapsed(),
                })
            }
            Err(err) => {
                self.state = RunState::Failed;
                Err(err)
            }
        }
    }

    fn run_tasks(&mut self) -> HarnessResult<usize> {
        let verbose = self.manifest.verbose;
        let out = self.out.clone();
        let tasks: Vec<Task> = self.manifest.tasks.clone();

        self.environment.ensure_ready()?;
        self.state = RunState::EnvironmentReady;

        let mut tasks_run = 0;
        for task in &tasks {
            self.state = RunState::RunningTask;
            let session = self.environment.ensure_ready()?;

            // Replacing the whole map scopes bindings to this task
            session.set_variables(task.variables.clone());

            out.line(&format!(">>>>>>>> Processing:  {}", task.script.display()));
            let task_start = Instant::now();

            match task.kind {
                EngineKind::DeclarativeSession => {
                    let status = session
                        .process_file(&task.script)
                        .map_err(|err| script_failure(&task.script, err.to_string()))?;
                    if status != 0 {
                        return Err(script_failure(
                            &task.script,
                            format!("Error returned by engine session (status {})", status),
                        ));
                    }
                }
                EngineKind::BatchSql => {
                    let raw = fs::read_to_string(&task.script)
                        .map_err(|err| script_failure(&task.script, err.to_string()))?;
                    for statement in split_statements(&raw) {
                        if verbose {
                            out.blank();
                            out.line(">>> EXECUTING:");
                            out.line(statement);
                            out.blank();
                        }
                        let status = session
                            .process_statement(statement)
                            .map_err(|err| script_failure(&task.script, err.to_string()))?;
                        if status != 0 {
                            return Err(script_failure(
                                &task.script,
                                format!("statement returned status {}", status),
                            ));
                        }
                    }
                }
            }

            out.blank();
            out.line(&format!(
                ">>>>>>>> Script took:  {}ms",
                task_start.elapsed().as_millis()
            ));
            out.blank();
            tasks_run += 1;
        }

        Ok(tasks_run)
    }
}

fn script_failure(script: &Path, reason: String) -> HarnessError {
    HarnessError::ScriptExecution {
        script: script.display().to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_manifest::load_manifest;
    use std::io::Write;
    use std::path::PathBuf;

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn script(&self, name: &str, body: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, body).unwrap();
            path
        }

        fn manifest(&self, body: &str) -> TaskManifest {
            let path = self.dir.path().join("manifest.json");
            let mut file = fs::File::create(&path).unwrap();
            file.write_all(body.as_bytes()).unwrap();
            load_manifest(&path).unwrap()
        }

        fn workspace(&self) -> PathBuf {
            self.dir.path().join("ws")
        }
    }

    fn manifest_for(fixture: &Fixture, scripts: &[(&str, &str)]) -> TaskManifest {
        let tasks: Vec<String> = scripts
            .iter()
            .map(|(name, body)| {
                let path = fixture.script(name, body);
                format!(r#"{{ "script": "{}" }}"#, path.display())
            })
            .collect();
        fixture.manifest(&format!(
            r#"{{ "quietOutput": true, "tasks": [{}] }}"#,
            tasks.join(",")
        ))
    }

    #[test]
    fn test_tasks_run_in_manifest_order() {
        let fixture = Fixture::new();
        let manifest = manifest_for(
            &fixture,
            &[
                ("one.q", "CREATE TABLE first (id INT);"),
                ("two.q", "CREATE TABLE second (id INT);"),
            ],
        );
        let out = OutputSink::capture();
        let mut orchestrator = Orchestrator::new(manifest, fixture.workspace(), out.clone());
        let report = orchestrator.run().unwrap();

        assert_eq!(report.tasks_run, 2);
        assert_eq!(orchestrator.state(), RunState::Done);

        let state = orchestrator.environment().session_state().unwrap();
        assert_eq!(state.catalog.table_names(), vec!["first", "second"]);

        let captured = out.captured().unwrap();
        let one = captured.find("one.q").unwrap();
        let two = captured.find("two.q").unwrap();
        assert!(one < two);
    }

    #[test]
    fn test_failure_aborts_remaining_tasks() {
        let fixture = Fixture::new();
        let manifest = manifest_for(
            &fixture,
            &[
                ("ok.q", "CREATE TABLE t (id INT);"),
                ("bad.q", "DESCRIBE missing_table;"),
                ("never.q", "CREATE TABLE unreached (id INT);"),
            ],
        );
        let out = OutputSink::capture();
        let mut orchestrator = Orchestrator::new(manifest, fixture.workspace(), out.clone());
        let err = orchestrator.run().unwrap_err();

        let HarnessError::ScriptExecution { script, .. } = err else {
            panic!("expected script failure");
        };
        assert!(script.ends_with("bad.q"));
        assert_eq!(orchestrator.state(), RunState::Failed);

        let captured = out.captured().unwrap();
        assert!(!captured.contains("never.q"));
        let state = orchestrator.environment().session_state().unwrap();
        assert!(state.catalog.table("unreached").is_none());
    }

    #[test]
    fn test_variables_do_not_leak_across_tasks() {
        let fixture = Fixture::new();
        let first = fixture.script("one.q", "CREATE TABLE ${TBL} (id INT);");
        let second = fixture.script("two.q", "SHOW TABLES;");
        let manifest = fixture.manifest(&format!(
            r#"{{ "quietOutput": true, "tasks": [
                {{ "script": "{}", "variables": {{ "TBL": "from_vars" }} }},
                {{ "script": "{}" }}
            ] }}"#,
            first.display(),
            second.display()
        ));

        let mut orchestrator =
            Orchestrator::new(manifest, fixture.workspace(), OutputSink::capture());
        orchestrator.run().unwrap();

        let state = orchestrator.environment().session_state().unwrap();
        assert!(state.catalog.table("from_vars").is_some());
        // The second task's (empty) binding replaced the first's
        assert!(state.variables.is_empty());
    }

    #[test]
    fn test_neutralized_run_does_no_real_work() {
        let fixture = Fixture::new();
        let manifest = manifest_for(
            &fixture,
            &[(
                "pipeline.q",
                "CREATE TABLE events (id INT);\nINSERT OVERWRITE TABLE events SELECT 1;\nSELECT count(*) FROM events;",
            )],
        );
        let out = OutputSink::capture();
        let mut orchestrator = Orchestrator::new(manifest, fixture.workspace(), out.clone());
        orchestrator.run().unwrap();

        let state = orchestrator.environment().session_state().unwrap();
        assert_eq!(state.work.units(), 0);
        assert!(out.captured().unwrap().contains("> Skipped!"));
    }

    #[test]
    fn test_cluster_execution_leaves_engine_unmodified() {
        let fixture = Fixture::new();
        let script = fixture.script("pipeline.q", "SELECT 1;");
        let manifest = fixture.manifest(&format!(
            r#"{{ "enableHadoop": true, "quietOutput": true,
                 "tasks": [ {{ "script": "{}" }} ] }}"#,
            script.display()
        ));
        let mut orchestrator =
            Orchestrator::new(manifest, fixture.workspace(), OutputSink::capture());
        orchestrator.run().unwrap();

        let state = orchestrator.environment().session_state().unwrap();
        assert_ne!(state.work.units(), 0);
    }

    #[test]
    fn test_batch_sql_propagates_statement_errors() {
        let fixture = Fixture::new();
        let script = fixture.script("batch.sql", "SELECT 1; GRANT ALL TO nobody;");
        let manifest = fixture.manifest(&format!(
            r#"{{ "quietOutput": true,
                 "tasks": [ {{ "script": "{}", "type": "spark" }} ] }}"#,
            script.display()
        ));
        let mut orchestrator =
            Orchestrator::new(manifest, fixture.workspace(), OutputSink::capture());
        let err = orchestrator.run().unwrap_err();
        assert!(matches!(err, HarnessError::ScriptExecution { .. }));
    }

    #[test]
    fn test_batch_sql_echoes_statements_when_verbose() {
        let fixture = Fixture::new();
        let script = fixture.script("batch.sql", "SELECT 1;\nSELECT 2;");
        let manifest = fixture.manifest(&format!(
            r#"{{ "verboseOutput": true,
                 "tasks": [ {{ "script": "{}", "type": "spark" }} ] }}"#,
            script.display()
        ));
        let out = OutputSink::capture();
        let mut orchestrator = Orchestrator::new(manifest, fixture.workspace(), out.clone());
        orchestrator.run().unwrap();

        let captured = out.captured().unwrap();
        assert_eq!(captured.matches(">>> EXECUTING:").count(), 2);
    }

    #[test]
    fn test_debug_echoes_raw_manifest() {
        let fixture = Fixture::new();
        let script = fixture.script("a.q", "SHOW TABLES;");
        let manifest = fixture.manifest(&format!(
            r#"{{ "debugOutput": true, "quietOutput": true,
                 "tasks": [ {{ "script": "{}" }} ] }}"#,
            script.display()
        ));
        let out = OutputSink::capture();
        let mut orchestrator = Orchestrator::new(manifest, fixture.workspace(), out.clone());
        orchestrator.run().unwrap();
        assert!(out.captured().unwrap().contains("debugOutput"));
    }

    #[test]
    fn test_missing_script_fails_with_its_path() {
        let fixture = Fixture::new();
        let manifest = fixture.manifest(
            r#"{ "quietOutput": true, "tasks": [ { "script": "/no/such/script.q" } ] }"#,
        );
        let mut orchestrator =
            Orchestrator::new(manifest, fixture.workspace(), OutputSink::capture());
        let err = orchestrator.run().unwrap_err();
        let HarnessError::ScriptExecution { script, .. } = err else {
            panic!("expected script failure");
        };
        assert_eq!(script, "/no/such/script.q");
    }

    #[test]
    fn test_progress_banner_per_script() {
        let fixture = Fixture::new();
        let manifest = manifest_for(&fixture, &[("a.q", "SHOW TABLES;")]);
        let out = OutputSink::capture();
        let mut orchestrator = Orchestrator::new(manifest, fixture.workspace(), out.clone());
        orchestrator.run().unwrap();
        assert!(out.captured().unwrap().contains(">>>>>>>> Processing:  "));
        assert!(out.captured().unwrap().contains(">>>>>>>> Script took:  "));
    }
}
