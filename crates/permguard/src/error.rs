// error.rs - Error types for the permission guard.
//
// Only `InsufficientPermissions` is raised on the request path. The config
// variants come from loading a GuardConfig file and never from a check.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during guard operations.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The configured policy rejected the caller's granted permissions.
    ///
    /// `detail` is whatever the policy returned as its rejection reason,
    /// forwarded untouched. `source` is reserved for an upstream cause and
    /// is always `None` when raised by the guard itself.
    #[error("Insufficient permissions")]
    InsufficientPermissions {
        detail: Value,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to read a guard configuration file.
    #[error("failed to read guard config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A guard configuration file is not valid YAML (or JSON).
    #[error("invalid guard config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

impl GuardError {
    /// Build an `InsufficientPermissions` error with no upstream cause.
    pub fn insufficient(detail: impl Into<Value>) -> Self {
        GuardError::InsufficientPermissions {
            detail: detail.into(),
            source: None,
        }
    }

    /// Status code hint for the transport layer (403 for permission failures).
    pub fn code(&self) -> u16 {
        match self {
            GuardError::InsufficientPermissions { .. } => 403,
            GuardError::ConfigRead { .. } | GuardError::ConfigParse(_) => 500,
        }
    }

    /// The rejection detail, if this is a permission failure.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            GuardError::InsufficientPermissions { detail, .. } => Some(detail),
            _ => None,
        }
    }
}
