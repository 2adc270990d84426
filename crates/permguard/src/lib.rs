//! # permguard
//!
//! Permission enforcement middleware for service actions.
//!
//! Actions declare the permissions they require (`true` for "my own name",
//! or an explicit list of tags). The [`PermissionGuard`] wraps each
//! protected handler so that, per request, the caller's granted permissions
//! are read from the context and compared with the requirement by a
//! pluggable policy. A rejected request never reaches the handler.
//!
//! ## Key invariants
//!
//! - **Unprotected means untouched**: actions without a valid declaration
//!   keep their original handler.
//! - **Missing grants mean no grants**: an absent or malformed permissions
//!   value in the context is treated as an empty grant set.
//! - **Registry only grows**: every tag any registered action declares is
//!   listed by [`PermissionGuard::permissions`].
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use permguard::{ActionDef, ActionHandler, GuardError, PermissionGuard, ServiceMiddleware};
//! use serde_json::{json, Value};
//!
//! let guard = PermissionGuard::default();
//! let handler: ActionHandler<GuardError> =
//!     Arc::new(|_ctx: &Value| -> Result<Value, GuardError> { Ok(json!("done")) });
//! let wrapped = guard.local_action(handler, &ActionDef::new("orders.cancel", true));
//!
//! let ctx = json!({ "meta": { "user": { "permissions": ["orders:cancel"] } } });
//! assert_eq!(wrapped(&ctx).unwrap(), json!("done"));
//! assert!(wrapped(&json!({})).is_err());
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod guard;
pub mod path;
pub mod policy;
pub mod registry;

pub use action::{
    sanitize_name, ActionDef, PermissionRequirement, ServiceCatalog, ServiceDef,
};
pub use config::GuardConfig;
pub use error::GuardError;
pub use guard::{ActionHandler, PermissionGuard, ServiceMiddleware};
pub use path::{resolve, PathIndex};
pub use policy::{basic_permission_check, CheckFunction, PolicyDecision};
pub use registry::PermissionRegistry;
