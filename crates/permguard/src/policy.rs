// policy.rs - Permission comparison policies.
//
// A policy is a plain function value: it receives the caller's granted
// permissions (whatever sits at the configured context path, if anything),
// the permissions an action requires, and the guard configuration. It
// answers Allow, or Deny with a detail value that the guard forwards
// verbatim into `GuardError::InsufficientPermissions`.
//
// The default policy is a subset check. A granted value that is not a JSON
// array counts as "nothing granted" rather than a configuration error.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GuardConfig;

/// Prefix of the rejection message produced by [`basic_permission_check`].
pub const MISSING_PERMISSIONS_PREFIX: &str =
    "You don't have enough permissions in order to do that! Missing permissions: ";

/// The outcome of a policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    /// The caller's grants satisfy the requirement.
    Allow,
    /// The request is rejected; `detail` explains why.
    Deny { detail: Value },
}

impl PolicyDecision {
    /// Shorthand for a `Deny` with any JSON-convertible detail.
    pub fn deny(detail: impl Into<Value>) -> Self {
        PolicyDecision::Deny {
            detail: detail.into(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

type PolicyFn = dyn Fn(Option<&Value>, &[String], &GuardConfig) -> PolicyDecision + Send + Sync;

/// A shareable, replaceable policy function.
///
/// Cloning is cheap (`Arc`). The default is [`basic_permission_check`].
#[derive(Clone)]
pub struct CheckFunction(Arc<PolicyFn>);

impl CheckFunction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &[String], &GuardConfig) -> PolicyDecision + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluate the policy.
    pub fn call(
        &self,
        granted: Option<&Value>,
        requested: &[String],
        config: &GuardConfig,
    ) -> PolicyDecision {
        (self.0)(granted, requested, config)
    }
}

impl Default for CheckFunction {
    fn default() -> Self {
        Self::new(basic_permission_check)
    }
}

impl fmt::Debug for CheckFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CheckFunction(..)")
    }
}

/// Text form of a permission entry.
///
/// Strings are used as is; any other JSON value becomes its JSON text
/// (`7` → `"7"`). Declared and granted entries go through the same
/// conversion, so both sides of a comparison always agree.
pub fn tag_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Default policy: every requested permission must appear in `granted`.
///
/// Missing permissions are reported in the order they were requested.
pub fn basic_permission_check(
    granted: Option<&Value>,
    requested: &[String],
    _config: &GuardConfig,
) -> PolicyDecision {
    let missing: Vec<&str> = match granted {
        Some(Value::Array(items)) => requested
            .iter()
            .filter(|p| !items.iter().any(|g| tag_text(g) == p.as_str()))
            .map(String::as_str)
            .collect(),
        _ => requested.iter().map(String::as_str).collect(),
    };

    if missing.is_empty() {
        PolicyDecision::Allow
    } else {
        PolicyDecision::deny(format!(
            "{}{}",
            MISSING_PERMISSIONS_PREFIX,
            missing.join(", ")
        ))
    }
}
