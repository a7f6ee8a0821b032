//! The policy catalog and its application.

use drydock_core::OutputSink;
use drydock_engine::{config_keys, stage_names};
use drydock_intercept::{BehaviorSpec, InterceptError, InterceptMode, InterceptRegistry};

/// Operation kinds considered data-moving, replaced with no-op successes
///
/// The list covers every engine build the harness has been pointed at; names
/// absent from the build currently loaded are skipped with a warning at
/// apply time.
pub const DATA_MOVING_STAGES: &[&str] = &[
    stage_names::MAP_REDUCE,
    stage_names::LOCAL_MAP_REDUCE,
    stage_names::MOVE,
    stage_names::FETCH,
    stage_names::COPY,
    stage_names::MERGE,
    stage_names::STATS,
    // Present only in other engine builds
    "exec.tez_stage",
    "exec.index_rebuild_stage",
    "exec.partial_scan_stage",
    "exec.column_truncate_stage",
];

/// Line a neutralized stage writes in place of its body
pub const SKIP_MESSAGE: &str = "> Skipped!";

/// Trace line emitted before every stage runs, neutralized or not
pub const DISPATCH_TRACE_TEMPLATE: &str = "> Running stage:  {0}";

/// Cluster-only configuration keys renamed before they reach the local
/// config store
pub const CLUSTER_CONFIG_RENAMES: &[(&str, &str)] = &[(
    "engine.optimize.remote.query",
    "clusterengine.optimize.remote.query",
)];

/// Apply the whole catalog to an engine's operation table
///
/// Installs, in order: the dispatch trace prefix (unconditional, so DDL and
/// metadata operations stay visible in logs), the force-sequential prefix at
/// the stage scheduling point, the configuration-key rename prefix on the
/// set-command path, and one replacement per data-moving stage.
///
/// # Errors
///
/// [`InterceptError::PatchFailure`] is fatal and returned immediately.
/// [`InterceptError::TargetNotFound`] on a data-moving entry is recovered:
/// one warning on `out`, remaining entries still apply. The three auxiliary
/// hook points are part of every engine build, so a missing one is returned
/// as-is.
pub fn apply(registry: &InterceptRegistry, out: &OutputSink) -> Result<(), InterceptError> {
    registry.install(
        stage_names::STAGE_DISPATCH,
        InterceptMode::Prefix,
        BehaviorSpec::EmitLine {
            template: DISPATCH_TRACE_TEMPLATE.to_string(),
        },
    )?;

    // Concurrent stage execution only slows these simulated runs down, and
    // makes failure attribution nondeterministic
    registry.install(
        stage_names::LAUNCH_STAGE,
        InterceptMode::Prefix,
        BehaviorSpec::ForceConfig {
            key: config_keys::EXEC_PARALLEL.to_string(),
            value: "false".to_string(),
        },
    )?;

    registry.install(
        stage_names::SET_COMMAND,
        InterceptMode::Prefix,
        BehaviorSpec::RewriteArgs {
            rules: CLUSTER_CONFIG_RENAMES
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
        },
    )?;

    for stage in DATA_MOVING_STAGES {
        let result = registry.install(
            stage,
            InterceptMode::Replace,
            BehaviorSpec::SkipWithStatus {
                message: SKIP_MESSAGE.to_string(),
                status: 0,
            },
        );
        match result {
            Ok(()) => {}
            Err(InterceptError::TargetNotFound { .. }) => {
                out.line(&format!(
                    "[WARN] Could not neutralize stage for this engine build:  {}",
                    stage
                ));
            }
            Err(fatal) => return Err(fatal),
        }
    }

    tracing::debug!("neutralization policy applied");
    Ok(())
}
