// check.rs - Dry-run one action's permission check against a context file.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use permguard::{
    ActionHandler, GuardConfig, GuardError, PermissionGuard, ServiceCatalog, ServiceMiddleware,
};
use serde_json::Value;

/// Result of a dry run.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// The action is unprotected; no check ran.
    Unprotected,
    Allowed,
    Denied(Value),
}

pub fn execute(
    catalog_path: &Path,
    action: &str,
    context_path: &Path,
    config: GuardConfig,
) -> anyhow::Result<()> {
    let catalog = ServiceCatalog::load(catalog_path)?;
    tracing::debug!(
        catalog = %catalog_path.display(),
        services = catalog.services.len(),
        "loaded service catalog"
    );
    let raw = std::fs::read_to_string(context_path)
        .with_context(|| format!("failed to read context {}", context_path.display()))?;
    let ctx: Value = serde_json::from_str(&raw)
        .with_context(|| format!("context {} is not valid JSON", context_path.display()))?;

    match run(&catalog, action, &ctx, config)? {
        Outcome::Unprotected => println!("allowed ({} is not protected)", action),
        Outcome::Allowed => println!("allowed"),
        Outcome::Denied(detail) => {
            match detail.as_str() {
                Some(message) => println!("denied: {}", message),
                None => println!("denied: {}", detail),
            }
            anyhow::bail!("permission check failed for {}", action);
        }
    }
    Ok(())
}

/// Wrap a no-op handler for `action` and invoke it with `ctx`.
pub fn run(
    catalog: &ServiceCatalog,
    action: &str,
    ctx: &Value,
    config: GuardConfig,
) -> anyhow::Result<Outcome> {
    let def = catalog
        .find_action(action)
        .with_context(|| format!("action '{}' not found in catalog", action))?;

    let guard = PermissionGuard::new(config);
    if guard.required_permissions(def).is_none() {
        tracing::debug!(action, "action is unprotected, skipping check");
        return Ok(Outcome::Unprotected);
    }

    let noop: ActionHandler<GuardError> =
        Arc::new(|_ctx: &Value| -> Result<Value, GuardError> { Ok(Value::Null) });
    let wrapped = guard.local_action(noop, def);
    match wrapped(ctx) {
        Ok(_) => Ok(Outcome::Allowed),
        Err(GuardError::InsufficientPermissions { detail, .. }) => Ok(Outcome::Denied(detail)),
        Err(e) => Err(e.into()),
    }
}
