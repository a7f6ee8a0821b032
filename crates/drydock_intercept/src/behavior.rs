//! Behavior fragments and their compilation.

use drydock_engine::{EngineResult, OperationContext};
use std::sync::Arc;

/// Compiled hook running before an operation body
pub type PrefixHook = Arc<dyn Fn(&mut OperationContext<'_>) -> EngineResult<()> + Send + Sync>;
/// Compiled body substituting an operation
pub type ReplaceBody = Arc<dyn Fn(&mut OperationContext<'_>) -> EngineResult<i32> + Send + Sync>;
/// Compiled hook running after a successful operation body
pub type SuffixHook =
    Arc<dyn Fn(&mut OperationContext<'_>, i32) -> EngineResult<()> + Send + Sync>;

/// Executable fragment installed at an interception point
///
/// The declarative variants cover everything the neutralization policy
/// needs; the `*Fn` variants carry arbitrary closures for callers with
/// bespoke needs (tests, mostly).
#[derive(Clone)]
pub enum BehaviorSpec {
    /// Write one line to the console; `{operation}` expands to the target
    /// name, `{0}`..`{9}` to positional arguments, `{status}` (suffix mode
    /// only) to the original body's result
    EmitLine {
        /// Line template
        template: String,
    },
    /// Overwrite a session configuration entry
    ForceConfig {
        /// Configuration key
        key: String,
        /// Value to force
        value: String,
    },
    /// Rename matching positional arguments before the body sees them;
    /// each rule maps an exact (case-insensitive) argument value to its
    /// replacement
    RewriteArgs {
        /// `(from, to)` rename rules
        rules: Vec<(String, String)>,
    },
    /// Replace the body: log a line and report the given status without
    /// doing any work
    SkipWithStatus {
        /// Line written in place of the body
        message: String,
        /// Status reported to the caller
        status: i32,
    },
    /// Arbitrary prefix closure
    PrefixFn(PrefixHook),
    /// Arbitrary replacement closure
    ReplaceFn(ReplaceBody),
    /// Arbitrary suffix closure
    SuffixFn(SuffixHook),
}

impl BehaviorSpec {
    /// Short human-readable form, used in patch failure reports
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::EmitLine { template } => format!("emit-line {:?}", template),
            Self::ForceConfig { key, value } => format!("force-config {}={}", key, value),
            Self::RewriteArgs { rules } => format!("rewrite-args ({} rules)", rules.len()),
            Self::SkipWithStatus { status, .. } => format!("skip-with-status {}", status),
            Self::PrefixFn(_) => "custom prefix".to_string(),
            Self::ReplaceFn(_) => "custom replacement".to_string(),
            Self::SuffixFn(_) => "custom suffix".to_string(),
        }
    }
}

impl std::fmt::Debug for BehaviorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Validate an emit-line template's placeholders
///
/// `allow_status` is true only in suffix position, where a result exists.
fn check_template(template: &str, allow_status: bool) -> Result<(), String> {
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let tail = &rest[start + 1..];
        let Some(end) = tail.find('}') else {
            return Err(format!("unterminated placeholder in {:?}", template));
        };
        let token = &tail[..end];
        let ok = token == "operation"
            || (token == "status" && allow_status)
            || (token.len() == 1 && token.chars().all(|c| c.is_ascii_digit()));
        if !ok {
            return Err(format!("unknown placeholder {{{}}}", token));
        }
        rest = &tail[end + 1..];
    }
    Ok(())
}

fn render(template: &str, ctx: &OperationContext<'_>, status: Option<i32>) -> String {
    let mut line = template.replace("{operation}", &ctx.operation);
    if let Some(status) = status {
        line = line.replace("{status}", &status.to_string());
    }
    for index in 0..10 {
        let token = format!("{{{}}}", index);
        if line.contains(&token) {
            line = line.replace(&token, ctx.arg(index));
        }
    }
    line
}

/// Compile a fragment for prefix position
///
/// # Errors
///
/// Returns a reason string when the fragment is invalid or incompatible
/// with prefix position.
pub fn compile_prefix(spec: &BehaviorSpec) -> Result<PrefixHook, String> {
    match spec {
        BehaviorSpec::EmitLine { template } => {
            check_template(template, false)?;
            let template = template.clone();
            Ok(Arc::new(move |ctx| {
                let line = render(&template, ctx, None);
                ctx.out.line(&line);
                Ok(())
            }))
        }
        BehaviorSpec::ForceConfig { key, value } => {
            if key.is_empty() {
                return Err("force-config requires a non-empty key".to_string());
            }
            let key = key.clone();
            let value = value.clone();
            Ok(Arc::new(move |ctx| {
                ctx.session.config.insert(key.clone(), value.clone());
                Ok(())
            }))
        }
        BehaviorSpec::RewriteArgs { rules } => {
            if rules.is_empty() {
                return Err("rewrite-args requires at least one rule".to_string());
            }
            let rules = rules.clone();
            Ok(Arc::new(move |ctx| {
                for arg in &mut ctx.args {
                    for (from, to) in &rules {
                        if arg.eq_ignore_ascii_case(from) {
                            *arg = to.clone();
                        }
                    }
                }
                Ok(())
            }))
        }
        BehaviorSpec::PrefixFn(hook) => Ok(Arc::clone(hook)),
        BehaviorSpec::SkipWithStatus { .. } => {
            Err("skip-with-status produces a result; prefix position has none".to_string())
        }
        BehaviorSpec::ReplaceFn(_) | BehaviorSpec::SuffixFn(_) => {
            Err("fragment is not a prefix".to_string())
        }
    }
}

/// Compile a fragment for replace position
///
/// The compiled body must produce a status compatible with the operation's
/// contract, which is why only result-bearing fragments are accepted.
///
/// # Errors
///
/// Returns a reason string when the fragment cannot stand in for a body.
pub fn compile_replace(spec: &BehaviorSpec) -> Result<ReplaceBody, String> {
    match spec {
        BehaviorSpec::SkipWithStatus { message, status } => {
            let message = message.clone();
            let status = *status;
            Ok(Arc::new(move |ctx| {
                ctx.out.line(&message);
                Ok(status)
            }))
        }
        BehaviorSpec::ReplaceFn(body) => Ok(Arc::clone(body)),
        other => Err(format!(
            "{} produces no result; replace position requires one",
            other.describe()
        )),
    }
}

/// Compile a fragment for suffix position
///
/// # Errors
///
/// Returns a reason string when the fragment is invalid or incompatible
/// with suffix position.
pub fn compile_suffix(spec: &BehaviorSpec) -> Result<SuffixHook, String> {
    match spec {
        BehaviorSpec::EmitLine { template } => {
            check_template(template, true)?;
            let template = template.clone();
            Ok(Arc::new(move |ctx, status| {
                let line = render(&template, ctx, Some(status));
                ctx.out.line(&line);
                Ok(())
            }))
        }
        BehaviorSpec::ForceConfig { key, value } => {
            if key.is_empty() {
                return Err("force-config requires a non-empty key".to_string());
            }
            let key = key.clone();
            let value = value.clone();
            Ok(Arc::new(move |ctx, _status| {
                ctx.session.config.insert(key.clone(), value.clone());
                Ok(())
            }))
        }
        BehaviorSpec::SuffixFn(hook) => Ok(Arc::clone(hook)),
        other => Err(format!("{} cannot run in suffix position", other.describe())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_placeholders_validated() {
        assert!(check_template("> Running stage:  {0}", false).is_ok());
        assert!(check_template("{operation} done", false).is_ok());
        assert!(check_template("{status}", true).is_ok());
        assert!(check_template("{status}", false).is_err());
        assert!(check_template("{nope}", false).is_err());
        assert!(check_template("open {", false).is_err());
    }

    #[test]
    fn test_skip_with_status_rejected_as_prefix() {
        let spec = BehaviorSpec::SkipWithStatus {
            message: "> Skipped!".to_string(),
            status: 0,
        };
        assert!(compile_prefix(&spec).is_err());
        assert!(compile_replace(&spec).is_ok());
    }

    #[test]
    fn test_emit_line_rejected_as_replace() {
        let spec = BehaviorSpec::EmitLine {
            template: "hello".to_string(),
        };
        assert!(compile_replace(&spec).is_err());
    }

    #[test]
    fn test_force_config_requires_key() {
        let spec = BehaviorSpec::ForceConfig {
            key: String::new(),
            value: "false".to_string(),
        };
        assert!(compile_prefix(&spec).is_err());
    }

    #[test]
    fn test_rewrite_args_requires_rules() {
        let spec = BehaviorSpec::RewriteArgs { rules: Vec::new() };
        assert!(compile_prefix(&spec).is_err());
    }

    #[test]
    fn test_describe_is_compact() {
        let spec = BehaviorSpec::SkipWithStatus {
            message: "> Skipped!".to_string(),
            status: 0,
        };
        assert_eq!(spec.describe(), "skip-with-status 0");
    }
}
