//! Execution environment bootstrapper.
//!
//! Builds the per-run workspace: an ephemeral directory tree holding the
//! local catalog, scratch space, and log sink, plus a single engine session
//! configured to live inside it. Created lazily on first use; every
//! subsequent call is a no-op. Nothing survives across runs - the tree is
//! wiped and recreated at every bootstrap.

use drydock_core::{HarnessError, HarnessResult, OutputSink};
use drydock_engine::{builtin_table, config_keys, Session, SessionConfig};
use drydock_intercept::InterceptRegistry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default workspace directory name, created under the current directory
pub const WORKSPACE_DIR_NAME: &str = "drydock-tmp";

const SUBDIRS: &[&str] = &["metastore_db", "warehouse", "scratch", "local_scratch", "logs"];

/// Fresh, isolated workspace plus the process's one engine session
///
/// Exclusively owned by the orchestrator; nothing else mutates it.
pub struct ExecutionEnvironment {
    root: PathBuf,
    out: OutputSink,
    verbose: bool,
    neutralize: bool,
    aux_libraries: Vec<PathBuf>,
    session: Option<Session>,
}

impl ExecutionEnvironment {
    /// Environment rooted at the given directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, out: OutputSink) -> Self {
        Self {
            root: root.into(),
            out,
            verbose: false,
            neutralize: true,
            aux_libraries: Vec::new(),
            session: None,
        }
    }

    /// Echo statements as the session executes them
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Whether to apply the neutralization policy at bootstrap
    ///
    /// Off means the engine runs unmodified (cluster execution enabled).
    #[must_use]
    pub fn with_neutralization(mut self, neutralize: bool) -> Self {
        self.neutralize = neutralize;
        self
    }

    /// Auxiliary library bundles to register with the session, in order
    #[must_use]
    pub fn with_aux_libraries(mut self, paths: Vec<PathBuf>) -> Self {
        self.aux_libraries = paths;
        self
    }

    /// Workspace root path
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The session's state, once bootstrapped
    #[must_use]
    pub fn session_state(&self) -> Option<&drydock_engine::SessionState> {
        self.session.as_ref().map(Session::state)
    }

    /// Bootstrap on first call, then hand back the session
    ///
    /// # Errors
    ///
    /// [`HarnessError::EnvironmentInit`] for any filesystem failure,
    /// [`HarnessError::Patch`] when the neutralization policy cannot apply.
    pub fn ensure_ready(&mut self) -> HarnessResult<&mut Session> {
        if self.session.is_none() {
            self.bootstrap()?;
        }
        // Bootstrap either set the session or returned an error
        self.session
            .as_mut()
            .ok_or_else(|| HarnessError::EnvironmentInit {
                reason: "session missing after bootstrap".to_string(),
            })
    }

    fn bootstrap(&mut self) -> HarnessResult<()> {
        self.rebuild_workspace()
            .map_err(|err| HarnessError::EnvironmentInit {
                reason: format!("workspace @ {}: {}", self.root.display(), err),
            })?;

        let config = SessionConfig::new()
            .with_verbose(self.verbose)
            .with_entry(
                config_keys::METASTORE_CONNECT_URL,
                format!("local:{}", self.root.join("metastore_db").display()),
            )
            .with_entry(
                config_keys::METASTORE_WAREHOUSE_DIR,
                self.root.join("warehouse").display().to_string(),
            )
            .with_entry(
                config_keys::EXEC_SCRATCH_DIR,
                self.root.join("scratch").display().to_string(),
            )
            .with_entry(
                config_keys::EXEC_LOCAL_SCRATCH_DIR,
                self.root.join("local_scratch").display().to_string(),
            )
            .with_entry(
                config_keys::SESSION_HISTORY_DIR,
                self.root.join("logs").display().to_string(),
            );

        let table = builtin_table();

        if self.neutralize {
            let registry = InterceptRegistry::new(std::sync::Arc::clone(&table));
            drydock_policy::apply(&registry, &self.out)?;
        }

        let mut session = Session::new(config, table, self.out.clone());
        for path in &self.aux_libraries {
            session.register_resource(path.clone());
        }

        tracing::debug!(root = %self.root.display(), "execution environment ready");
        self.session = Some(session);
        Ok(())
    }

    fn rebuild_workspace(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        for subdir in SUBDIRS {
            fs::create_dir_all(self.root.join(subdir))?;
        }
        Ok(())
    }
}
