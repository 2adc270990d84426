// config.rs - Guard configuration.
//
// A GuardConfig is built once and handed to `PermissionGuard::new`, which
// freezes it behind an `Arc`. Every field has a default, so a config file
// only needs the keys it overrides. The check function cannot come from a
// file; loading always yields the default subset policy.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GuardError;
use crate::policy::CheckFunction;

/// Where granted permissions live in the request context by default.
pub const DEFAULT_PERMISSIONS_PATH: &str = "meta.user.permissions";

/// Separator that replaces `.` when an action name becomes a permission tag.
pub const DEFAULT_PERMISSIONS_SEP: &str = ":";

/// Configuration for a [`PermissionGuard`](crate::PermissionGuard).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Policy used to compare granted and requested permissions.
    #[serde(skip)]
    pub check_function: CheckFunction,

    /// Path (starting from the request context) to the granted permissions.
    #[serde(default = "default_permissions_path")]
    pub permissions_path: String,

    /// Separator used in permission tags derived from action names.
    #[serde(default = "default_permissions_sep")]
    pub permissions_sep: String,

    /// Separator used to split `permissions_path`. `None` means `"."`.
    /// Set it when a context key itself contains a dot.
    #[serde(default)]
    pub path_separator: Option<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            check_function: CheckFunction::default(),
            permissions_path: default_permissions_path(),
            permissions_sep: default_permissions_sep(),
            path_separator: None,
        }
    }
}

fn default_permissions_path() -> String {
    DEFAULT_PERMISSIONS_PATH.to_string()
}

fn default_permissions_sep() -> String {
    DEFAULT_PERMISSIONS_SEP.to_string()
}

impl GuardConfig {
    pub fn with_check_function(mut self, check_function: CheckFunction) -> Self {
        self.check_function = check_function;
        self
    }

    pub fn with_permissions_path(mut self, path: impl Into<String>) -> Self {
        self.permissions_path = path.into();
        self
    }

    pub fn with_permissions_sep(mut self, sep: impl Into<String>) -> Self {
        self.permissions_sep = sep.into();
        self
    }

    pub fn with_path_separator(mut self, sep: impl Into<String>) -> Self {
        self.path_separator = Some(sep.into());
        self
    }

    /// Parse a config from YAML (JSON is accepted too).
    pub fn from_yaml_str(content: &str) -> Result<Self, GuardError> {
        // An empty document means "all defaults".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, GuardError> {
        let content = std::fs::read_to_string(path).map_err(|source| GuardError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}
