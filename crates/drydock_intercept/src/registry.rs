//! The interception registry itself.

use crate::behavior::{
    compile_prefix, compile_replace, compile_suffix, BehaviorSpec, PrefixHook, ReplaceBody,
    SuffixHook,
};
use drydock_core::HarnessError;
use drydock_engine::{EngineResult, Operation, OperationContext, OperationTable};
use std::sync::Arc;

/// Where a behavior runs relative to the original operation body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptMode {
    /// Before the original body, with access to (and mutation rights over)
    /// its arguments
    Prefix,
    /// Instead of the original body, which never executes
    Replace,
    /// After the original body completes successfully, with access to its
    /// status
    Suffix,
}

/// Error installing an interception
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptError {
    /// Target name does not resolve in the loaded engine's definitions
    ///
    /// Callers may treat this as non-fatal; the neutralization policy skips
    /// such entries with a warning.
    TargetNotFound {
        /// The unresolved operation name
        operation: String,
    },
    /// Behavior fragment failed to compile or attach
    PatchFailure {
        /// Target operation name
        operation: String,
        /// Attempted behavior, in short form
        behavior: String,
        /// What went wrong
        reason: String,
    },
}

impl std::fmt::Display for InterceptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TargetNotFound { operation } => {
                write!(f, "no such operation in loaded engine: {}", operation)
            }
            Self::PatchFailure {
                operation,
                behavior,
                reason,
            } => {
                write!(
                    f,
                    "failed to patch:  operation={}, behavior={}: {}",
                    operation, behavior, reason
                )
            }
        }
    }
}

impl std::error::Error for InterceptError {}

impl From<InterceptError> for HarnessError {
    fn from(err: InterceptError) -> Self {
        match err {
            InterceptError::TargetNotFound { operation } => HarnessError::Patch {
                operation,
                reason: "target not found".to_string(),
            },
            InterceptError::PatchFailure {
                operation,
                behavior,
                reason,
            } => HarnessError::Patch {
                operation,
                reason: format!("behavior={}: {}", behavior, reason),
            },
        }
    }
}

struct PrefixedOp {
    inner: Arc<dyn Operation>,
    hook: PrefixHook,
}

impl Operation for PrefixedOp {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        (self.hook)(ctx)?;
        self.inner.execute(ctx)
    }
}

struct ReplacedOp {
    name: String,
    body: ReplaceBody,
}

impl Operation for ReplacedOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        (self.body)(ctx)
    }
}

struct SuffixedOp {
    inner: Arc<dyn Operation>,
    hook: SuffixHook,
}

impl Operation for SuffixedOp {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn execute(&self, ctx: &mut OperationContext<'_>) -> EngineResult<i32> {
        let status = self.inner.execute(ctx)?;
        (self.hook)(ctx, status)?;
        Ok(status)
    }
}

/// Installs behaviors onto named operations of one engine table
///
/// Installation is irreversible within the process: every later dispatch of
/// a patched target observes the modified behavior. Multiple installs on one
/// target stack, newest outermost.
pub struct InterceptRegistry {
    table: Arc<OperationTable>,
}

impl InterceptRegistry {
    /// Registry over the given engine table
    #[must_use]
    pub fn new(table: Arc<OperationTable>) -> Self {
        Self { table }
    }

    /// Install one behavior at the named operation
    ///
    /// # Errors
    ///
    /// [`InterceptError::TargetNotFound`] when the name does not resolve;
    /// [`InterceptError::PatchFailure`] when the fragment does not compile
    /// for the requested mode.
    pub fn install(
        &self,
        target: &str,
        mode: InterceptMode,
        behavior: BehaviorSpec,
    ) -> Result<(), InterceptError> {
        if !self.table.contains(target) {
            return Err(InterceptError::TargetNotFound {
                operation: target.to_string(),
            });
        }

        let patch_failure = |reason: String| InterceptError::PatchFailure {
            operation: target.to_string(),
            behavior: behavior.describe(),
            reason,
        };

        let swapped = match mode {
            InterceptMode::Prefix => {
                let hook = compile_prefix(&behavior).map_err(&patch_failure)?;
                self.table
                    .swap(target, move |inner| Arc::new(PrefixedOp { inner, hook }))
            }
            InterceptMode::Replace => {
                let body = compile_replace(&behavior).map_err(&patch_failure)?;
                let name = target.to_string();
                self.table
                    .swap(target, move |_inner| Arc::new(ReplacedOp { name, body }))
            }
            InterceptMode::Suffix => {
                let hook = compile_suffix(&behavior).map_err(&patch_failure)?;
                self.table
                    .swap(target, move |inner| Arc::new(SuffixedOp { inner, hook }))
            }
        };

        if !swapped {
            return Err(InterceptError::TargetNotFound {
                operation: target.to_string(),
            });
        }

        tracing::debug!(operation = target, ?mode, "installed interception");
        Ok(())
    }
}
