//! Versioned manifest schema parsing.
//!
//! Manifest revisions disagree on the verbosity flag (`quietOutput`,
//! inverted, vs `verboseOutput`, direct) and on whether the cluster-execution
//! flag is present at all. Rather than guess from historical behavior, the
//! loader accepts every known spelling and normalizes with explicit defaults:
//!
//! - cluster execution defaults to **off** (neutralized) when absent
//! - `verboseOutput` wins when both verbosity spellings are present;
//!   with neither present, output is verbose (`quietOutput: false` was the
//!   oldest revision's default)
//! - `debugOutput` defaults to false

use crate::model::{EngineKind, Task, TaskManifest};
use drydock_core::HarnessError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Required suffix for auxiliary library bundles
pub const AUX_LIBRARY_SUFFIX: &str = ".jar";

/// Error loading or validating a manifest document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// Document could not be read
    Unreadable { path: String, reason: String },
    /// Document is not valid JSON or is missing required fields
    Malformed { reason: String },
    /// A task names an engine kind the harness does not know
    UnknownTaskKind { value: String },
    /// Auxiliary library path does not exist
    AuxLibraryMissing { path: String },
    /// Auxiliary library path lacks the required suffix
    AuxLibrarySuffix { path: String },
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable { path, reason } => {
                write!(f, "could not read manifest @ {}: {}", path, reason)
            }
            Self::Malformed { reason } => write!(f, "malformed manifest: {}", reason),
            Self::UnknownTaskKind { value } => {
                write!(f, "unknown task type:  {}", value)
            }
            Self::AuxLibraryMissing { path } => {
                write!(f, "could not find library file to load @ {}", path)
            }
            Self::AuxLibrarySuffix { path } => {
                write!(
                    f,
                    "should be a list of {} files to load, but got:  {}",
                    AUX_LIBRARY_SUFFIX, path
                )
            }
        }
    }
}

impl std::error::Error for ManifestError {}

impl From<ManifestError> for HarnessError {
    fn from(err: ManifestError) -> Self {
        HarnessError::ManifestLoad {
            reason: err.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(rename = "enableHadoop")]
    enable_hadoop: Option<bool>,
    #[serde(rename = "enableClusterExecution")]
    enable_cluster_execution: Option<bool>,
    #[serde(rename = "quietOutput")]
    quiet_output: Option<bool>,
    #[serde(rename = "verboseOutput")]
    verbose_output: Option<bool>,
    #[serde(rename = "debugOutput")]
    debug_output: Option<bool>,
    #[serde(rename = "auxJars", default)]
    aux_jars: Vec<String>,
    tasks: Vec<RawTask>,
}

#[derive(Deserialize)]
struct RawTask {
    script: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    variables: IndexMap<String, String>,
}

fn parse_kind(raw: Option<&str>) -> Result<EngineKind, ManifestError> {
    match raw {
        None => Ok(EngineKind::DeclarativeSession),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "hive" => Ok(EngineKind::DeclarativeSession),
            "spark" => Ok(EngineKind::BatchSql),
            _ => Err(ManifestError::UnknownTaskKind {
                value: value.to_string(),
            }),
        },
    }
}

fn validate_aux_library(path: &str) -> Result<PathBuf, ManifestError> {
    if !path.ends_with(AUX_LIBRARY_SUFFIX) {
        return Err(ManifestError::AuxLibrarySuffix {
            path: path.to_string(),
        });
    }
    let resolved = PathBuf::from(path);
    if !resolved.exists() {
        return Err(ManifestError::AuxLibraryMissing {
            path: path.to_string(),
        });
    }
    Ok(resolved)
}

/// Load and normalize a manifest document
///
/// Auxiliary library paths are validated here, before any task runs: each
/// must exist and carry [`AUX_LIBRARY_SUFFIX`].
///
/// # Errors
///
/// Returns [`ManifestError`] for unreadable or malformed documents, unknown
/// task kinds, and invalid auxiliary library paths.
pub fn load_manifest(path: &Path) -> Result<TaskManifest, ManifestError> {
    let raw_document = fs::read_to_string(path).map_err(|err| ManifestError::Unreadable {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;

    let raw: RawManifest =
        serde_json::from_str(&raw_document).map_err(|err| ManifestError::Malformed {
            reason: err.to_string(),
        })?;

    let cluster_execution = raw
        .enable_cluster_execution
        .or(raw.enable_hadoop)
        .unwrap_or(false);

    let verbose = match (raw.verbose_output, raw.quiet_output) {
        (Some(direct), _) => direct,
        (None, Some(quiet)) => !quiet,
        (None, None) => true,
    };

    let mut aux_libraries = Vec::with_capacity(raw.aux_jars.len());
    for entry in &raw.aux_jars {
        aux_libraries.push(validate_aux_library(entry)?);
    }

    let mut tasks = Vec::with_capacity(raw.tasks.len());
    for raw_task in raw.tasks {
        tasks.push(Task {
            script: PathBuf::from(raw_task.script),
            kind: parse_kind(raw_task.kind.as_deref())?,
            variables: raw_task.variables,
        });
    }

    Ok(TaskManifest {
        cluster_execution,
        verbose,
        debug: raw.debug_output.unwrap_or(false),
        aux_libraries,
        tasks,
        raw_document,
    })
}
