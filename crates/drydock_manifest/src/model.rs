//! Manifest model types.

use indexmap::IndexMap;
use std::path::PathBuf;

/// Submission protocol for a task's script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Whole file handed to the session's process-file entry point,
    /// which does its own sub-sequencing and returns one status
    #[default]
    DeclarativeSession,
    /// File split into statements, each submitted individually in order
    BatchSql,
}

/// One manifest-declared unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Script file containing one or more statements
    pub script: PathBuf,
    /// Which submission protocol to use
    pub kind: EngineKind,
    /// Variables bound into the engine session for this task only
    pub variables: IndexMap<String, String>,
}

impl Task {
    /// Create a task with the default engine kind and no variables
    #[must_use]
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            kind: EngineKind::default(),
            variables: IndexMap::new(),
        }
    }

    /// Set the engine kind
    #[must_use]
    pub fn with_kind(mut self, kind: EngineKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add a task-local variable binding
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// Immutable description of a run
///
/// Task ordering is exactly manifest order; nothing reorders or parallelizes
/// across tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskManifest {
    /// When false, data-moving operations are neutralized before any script
    /// runs; when true, the engine runs unmodified
    pub cluster_execution: bool,
    /// Echo each submitted statement before execution
    pub verbose: bool,
    /// Additionally echo the raw manifest document at startup
    pub debug: bool,
    /// Auxiliary library bundles to register with the engine, in order
    pub aux_libraries: Vec<PathBuf>,
    /// Tasks, in execution order
    pub tasks: Vec<Task>,
    /// Raw document text, kept for the debug echo
    pub raw_document: String,
}

impl TaskManifest {
    /// Number of tasks in the manifest
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_defaults_to_declarative() {
        assert_eq!(EngineKind::default(), EngineKind::DeclarativeSession);
        assert_eq!(Task::new("a.q").kind, EngineKind::DeclarativeSession);
    }

    #[test]
    fn test_task_builder_keeps_variable_order() {
        let task = Task::new("a.q")
            .with_variable("zeta", "1")
            .with_variable("alpha", "2");
        let names: Vec<&str> = task.variables.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
