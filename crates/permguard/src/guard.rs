// guard.rs - The permission guard and its middleware hooks.
//
// The guard plugs into a host framework through two hooks:
//
// 1. `service_created` - called once per registered service. Collects every
//    permission tag its actions declare into the registry.
// 2. `local_action` - called once per action when the host builds its
//    handler chain. Protected actions get a wrapper that runs `check`
//    before the real handler. Unprotected actions keep their handler as is.
//
// Per request, the wrapper reads the granted permissions from the context
// at `permissions_path`, runs the configured policy, and either calls the
// handler or fails with `GuardError::InsufficientPermissions`. No I/O, no
// blocking, nothing retained from the context.

use std::sync::Arc;

use serde_json::Value;

use crate::action::{sanitize_name, ActionDef, ServiceDef};
use crate::config::GuardConfig;
use crate::error::GuardError;
use crate::path;
use crate::policy::PolicyDecision;
use crate::registry::PermissionRegistry;

/// A host action handler: takes the request context, returns a result.
///
/// `E` is the host's error type. It must be able to carry a `GuardError`.
pub type ActionHandler<E> = Arc<dyn Fn(&Value) -> Result<Value, E> + Send + Sync>;

/// Lifecycle hooks a host framework invokes on its middlewares.
pub trait ServiceMiddleware {
    /// A service (unit of actions) has been registered.
    fn service_created(&self, service: &ServiceDef);

    /// Build the handler that will actually serve `action`.
    fn local_action<E>(&self, handler: ActionHandler<E>, action: &ActionDef) -> ActionHandler<E>
    where
        E: From<GuardError> + 'static;
}

/// Enforces declared action permissions against the caller's grants.
///
/// Cheap to share: configuration and registry live behind `Arc`s, and all
/// methods take `&self`.
#[derive(Debug, Default)]
pub struct PermissionGuard {
    config: Arc<GuardConfig>,
    registry: Arc<PermissionRegistry>,
}

impl PermissionGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(PermissionRegistry::new()),
        }
    }

    /// Every permission tag declared by the services seen so far.
    pub fn permissions(&self) -> Vec<String> {
        self.registry.snapshot()
    }

    /// Compare `granted` against `requested` with the configured policy.
    ///
    /// Success is silent. Any rejection becomes
    /// [`GuardError::InsufficientPermissions`] carrying the policy's detail.
    pub fn check(&self, granted: Option<&Value>, requested: &[String]) -> Result<(), GuardError> {
        check_with(&self.config, granted, requested)
    }

    /// Replace every "." in an action name with the configured separator.
    pub fn sanitize_name(&self, action_name: &str) -> String {
        sanitize_name(action_name, &self.config.permissions_sep)
    }

    /// The concrete tags `action` requires, or `None` if it is unprotected.
    pub fn required_permissions(&self, action: &ActionDef) -> Option<Vec<String>> {
        action
            .permissions
            .resolve(|| self.sanitize_name(&action.name))
    }
}

impl ServiceMiddleware for PermissionGuard {
    fn service_created(&self, service: &ServiceDef) {
        let tags: Vec<String> = service
            .actions
            .values()
            .filter_map(|action| self.required_permissions(action))
            .flatten()
            .collect();
        let added = self.registry.register(tags);
        tracing::debug!(
            service = %service.name,
            actions = service.actions.len(),
            added,
            "registered service permissions"
        );
    }

    fn local_action<E>(&self, handler: ActionHandler<E>, action: &ActionDef) -> ActionHandler<E>
    where
        E: From<GuardError> + 'static,
    {
        let Some(perms) = self.required_permissions(action) else {
            return handler;
        };
        tracing::debug!(action = %action.name, ?perms, "installing permission check");

        let config = Arc::clone(&self.config);
        let action_name = action.name.clone();
        Arc::new(move |ctx: &Value| {
            let granted = path::resolve(
                &config.permissions_path,
                ctx,
                config.path_separator.as_deref(),
            );
            if let Err(e) = check_with(&config, granted, &perms) {
                tracing::info!(action = %action_name, "permission denied");
                return Err(E::from(e));
            }
            handler(ctx)
        })
    }
}

fn check_with(
    config: &GuardConfig,
    granted: Option<&Value>,
    requested: &[String],
) -> Result<(), GuardError> {
    match config.check_function.call(granted, requested, config) {
        PolicyDecision::Allow => Ok(()),
        PolicyDecision::Deny { detail } => {
            tracing::debug!(?requested, %detail, "permission check rejected");
            Err(GuardError::insufficient(detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::PermissionRequirement;
    use crate::policy::{CheckFunction, MISSING_PERMISSIONS_PREFIX};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Helper: a handler that counts its invocations and echoes "ok".
    fn counting_handler(calls: Arc<AtomicUsize>) -> ActionHandler<GuardError> {
        Arc::new(move |_ctx: &Value| -> Result<Value, GuardError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!("ok"))
        })
    }

    fn ctx_with(perms: Value) -> Value {
        json!({ "meta": { "user": { "permissions": perms } } })
    }

    #[test]
    fn check_passes_when_subset() {
        let guard = PermissionGuard::default();
        let granted = json!(["a", "b"]);
        assert!(guard.check(Some(&granted), &tags(&["a"])).is_ok());
        assert!(guard.check(Some(&granted), &[]).is_ok());
    }

    #[test]
    fn check_fails_with_structured_detail() {
        let guard = PermissionGuard::default();
        let granted = json!(["a"]);
        let err = guard
            .check(Some(&granted), &tags(&["a", "b", "c"]))
            .unwrap_err();
        match err {
            GuardError::InsufficientPermissions { detail, source } => {
                assert_eq!(detail, json!(format!("{}b, c", MISSING_PERMISSIONS_PREFIX)));
                assert!(source.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn absent_grants_equal_empty_grants() {
        let guard = PermissionGuard::default();
        let empty = json!([]);
        let a = guard.check(None, &tags(&["a", "b"])).unwrap_err();
        let b = guard.check(Some(&empty), &tags(&["a", "b"])).unwrap_err();
        assert_eq!(a.detail(), b.detail());
    }

    #[test]
    fn custom_policy_detail_is_forwarded_verbatim() {
        let config = GuardConfig::default().with_check_function(CheckFunction::new(
            |_, requested, _| PolicyDecision::deny(json!({ "denied": requested })),
        ));
        let guard = PermissionGuard::new(config);
        let err = guard.check(None, &tags(&["x"])).unwrap_err();
        assert_eq!(err.detail(), Some(&json!({ "denied": ["x"] })));
    }

    #[test]
    fn custom_policy_receives_config() {
        let config = GuardConfig::default()
            .with_permissions_sep("/")
            .with_check_function(CheckFunction::new(|_, _, cfg| {
                if cfg.permissions_sep == "/" {
                    PolicyDecision::Allow
                } else {
                    PolicyDecision::deny("wrong config")
                }
            }));
        let guard = PermissionGuard::new(config);
        assert!(guard.check(None, &tags(&["anything"])).is_ok());
    }

    #[test]
    fn sanitize_uses_configured_separator() {
        let guard = PermissionGuard::default();
        assert_eq!(guard.sanitize_name("orders.cancel"), "orders:cancel");
        // path_separator does not affect action naming.
        let guard = PermissionGuard::new(
            GuardConfig::default()
                .with_permissions_sep("-")
                .with_path_separator("/"),
        );
        assert_eq!(guard.sanitize_name("orders.cancel"), "orders-cancel");
    }

    #[test]
    fn service_created_collects_tags_without_duplicates() {
        let guard = PermissionGuard::default();
        let first = ServiceDef::new("a").with_action("b", true);
        let second = ServiceDef::new("svc").with_action("run", vec!["x", "y"]);

        guard.service_created(&first);
        guard.service_created(&second);
        guard.service_created(&first);
        guard.service_created(&second);

        assert_eq!(guard.permissions(), tags(&["a:b", "x", "y"]));
    }

    #[test]
    fn service_created_skips_malformed_but_processes_the_rest() {
        let guard = PermissionGuard::default();
        let mut svc = ServiceDef::new("users")
            .with_action("create", true)
            .with_action("update", vec!["users:write"]);
        svc.actions.insert(
            "broken".into(),
            ActionDef::new("users.broken", PermissionRequirement::from(json!("admin"))),
        );
        svc.actions.insert(
            "open".into(),
            ActionDef::new("users.open", PermissionRequirement::Unprotected),
        );

        guard.service_created(&svc);
        assert_eq!(guard.permissions(), tags(&["users:create", "users:write"]));
    }

    #[test]
    fn unprotected_action_keeps_same_handler() {
        let guard = PermissionGuard::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(Arc::clone(&calls));
        let action = ActionDef::new("public.ping", PermissionRequirement::Unprotected);

        let wrapped = guard.local_action(Arc::clone(&handler), &action);
        assert!(Arc::ptr_eq(&handler, &wrapped));
        assert_eq!(wrapped(&json!({})).unwrap(), json!("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn own_name_action_rejects_before_handler_runs() {
        let guard = PermissionGuard::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let action = ActionDef::new("orders.cancel", true);
        let wrapped = guard.local_action(counting_handler(Arc::clone(&calls)), &action);

        let err = wrapped(&ctx_with(json!(["orders:list"]))).unwrap_err();
        assert!(matches!(err, GuardError::InsufficientPermissions { .. }));
        assert_eq!(
            err.detail(),
            Some(&json!(format!("{}orders:cancel", MISSING_PERMISSIONS_PREFIX)))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn own_name_action_runs_handler_when_granted() {
        let guard = PermissionGuard::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let action = ActionDef::new("orders.cancel", true);
        let wrapped = guard.local_action(counting_handler(Arc::clone(&calls)), &action);

        let result = wrapped(&ctx_with(json!(["orders:cancel"]))).unwrap();
        assert_eq!(result, json!("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_requirement_with_missing_context_is_rejected() {
        let guard = PermissionGuard::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let action = ActionDef::new("reports.export", vec!["reports:read", "reports:export"]);
        let wrapped = guard.local_action(counting_handler(Arc::clone(&calls)), &action);

        let err = wrapped(&json!({ "params": {} })).unwrap_err();
        assert_eq!(
            err.detail(),
            Some(&json!(format!(
                "{}reports:read, reports:export",
                MISSING_PERMISSIONS_PREFIX
            )))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_explicit_requirement_always_passes() {
        let guard = PermissionGuard::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let action = ActionDef::new("misc.noop", Vec::<String>::new());
        let wrapped = guard.local_action(counting_handler(Arc::clone(&calls)), &action);

        assert!(wrapped(&json!(null)).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wrapper_reads_custom_path_with_custom_separator() {
        let guard = PermissionGuard::new(
            GuardConfig::default()
                .with_permissions_path("auth/claims.perms")
                .with_path_separator("/"),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let action = ActionDef::new("files.read", true);
        let wrapped = guard.local_action(counting_handler(Arc::clone(&calls)), &action);

        let ctx = json!({ "auth": { "claims.perms": ["files:read"] } });
        assert!(wrapped(&ctx).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_errors_pass_through_untouched() {
        let guard = PermissionGuard::default();
        let handler: ActionHandler<GuardError> =
            Arc::new(|_ctx: &Value| -> Result<Value, GuardError> {
                Err(GuardError::insufficient("from handler"))
            });
        let action = ActionDef::new("a.b", true);
        let wrapped = guard.local_action(handler, &action);

        let err = wrapped(&ctx_with(json!(["a:b"]))).unwrap_err();
        assert_eq!(err.detail(), Some(&json!("from handler")));
    }

    #[test]
    fn numeric_declared_permission_is_satisfied_by_numeric_grant() {
        let guard = PermissionGuard::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let action: ActionDef =
            serde_json::from_value(json!({ "name": "vault.open", "permissions": [7] })).unwrap();
        let wrapped = guard.local_action(counting_handler(Arc::clone(&calls)), &action);

        assert!(wrapped(&ctx_with(json!([7]))).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let err = wrapped(&ctx_with(json!([8, "vault:open"]))).unwrap_err();
        assert_eq!(
            err.detail(),
            Some(&json!(format!("{}7", MISSING_PERMISSIONS_PREFIX)))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PermissionGuard>();
    }
}
