//! Top-level error taxonomy for the harness.

use std::fmt;

/// Harness result type
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Fatal harness error
///
/// Every crate's local error type converts into one of these variants on the
/// way to the process boundary. A run is all-or-nothing: any variant aborts
/// it, and the message keeps the original cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// Manifest unreadable, malformed, or invalid
    ManifestLoad {
        /// What went wrong
        reason: String,
    },

    /// Workspace or session construction failed
    EnvironmentInit {
        /// What went wrong
        reason: String,
    },

    /// An interception behavior failed to compile or attach
    Patch {
        /// Target operation name
        operation: String,
        /// What went wrong
        reason: String,
    },

    /// A script returned a non-zero status or a statement error propagated
    ScriptExecution {
        /// Path of the offending script
        script: String,
        /// What went wrong
        reason: String,
    },

    /// Error surfaced by the hosted engine outside script execution
    Engine {
        /// Error message
        message: String,
    },
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManifestLoad { reason } => {
                write!(f, "Could not load manifest file: {}", reason)
            }
            Self::EnvironmentInit { reason } => {
                write!(f, "Could not initialize execution environment: {}", reason)
            }
            Self::Patch { operation, reason } => {
                write!(f, "Failed to patch operation {}: {}", operation, reason)
            }
            Self::ScriptExecution { script, reason } => {
                write!(f, "Failed to execute script:  {}: {}", script, reason)
            }
            Self::Engine { message } => write!(f, "Engine error: {}", message),
        }
    }
}

impl std::error::Error for HarnessError {}
