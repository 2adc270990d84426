// action.rs - Service and action metadata as seen by the guard.
//
// The host framework owns the real service objects. The guard only needs an
// action's qualified name (e.g. "users.create") and its permission
// declaration, which may be `true`, a list of tags, or anything else.
// Anything else means "not protected" and never raises an error.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GuardError;
use crate::policy::tag_text;

/// The permission requirement declared on an action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum PermissionRequirement {
    /// No declaration, or a declaration that is neither `true` nor a list.
    #[default]
    Unprotected,
    /// Declared as `true`: the action's own sanitized name is required.
    OwnName,
    /// An explicit list of required tags, in declaration order.
    Explicit(Vec<String>),
}

impl PermissionRequirement {
    /// Expand into the concrete list of required tags.
    ///
    /// `sanitized_name` is only called for [`OwnName`](Self::OwnName).
    /// Returns `None` for unprotected actions.
    pub fn resolve(&self, sanitized_name: impl FnOnce() -> String) -> Option<Vec<String>> {
        match self {
            PermissionRequirement::Unprotected => None,
            PermissionRequirement::OwnName => Some(vec![sanitized_name()]),
            PermissionRequirement::Explicit(tags) => Some(tags.clone()),
        }
    }
}

impl From<Value> for PermissionRequirement {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(true) => PermissionRequirement::OwnName,
            Value::Array(items) => PermissionRequirement::Explicit(
                items
                    .iter()
                    .map(|item| tag_text(item).into_owned())
                    .collect(),
            ),
            _ => PermissionRequirement::Unprotected,
        }
    }
}

impl From<PermissionRequirement> for Value {
    fn from(req: PermissionRequirement) -> Self {
        match req {
            PermissionRequirement::Unprotected => Value::Null,
            PermissionRequirement::OwnName => Value::Bool(true),
            PermissionRequirement::Explicit(tags) => {
                Value::Array(tags.into_iter().map(Value::String).collect())
            }
        }
    }
}

impl From<bool> for PermissionRequirement {
    fn from(flag: bool) -> Self {
        if flag {
            PermissionRequirement::OwnName
        } else {
            PermissionRequirement::Unprotected
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for PermissionRequirement {
    fn from(tags: Vec<S>) -> Self {
        tags.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionRequirement {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        PermissionRequirement::Explicit(iter.into_iter().map(Into::into).collect())
    }
}

/// Metadata for one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
    /// Fully qualified action name, e.g. "users.create".
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: PermissionRequirement,
}

impl ActionDef {
    pub fn new(name: impl Into<String>, permissions: impl Into<PermissionRequirement>) -> Self {
        Self {
            name: name.into(),
            permissions: permissions.into(),
        }
    }
}

/// A unit of actions registered with the host (a "service").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDef {
    pub name: String,
    /// Action key → metadata.
    #[serde(default)]
    pub actions: BTreeMap<String, ActionDef>,
}

impl ServiceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: BTreeMap::new(),
        }
    }

    /// Add an action under `key`; its qualified name is "<service>.<key>".
    pub fn with_action(
        mut self,
        key: impl Into<String>,
        permissions: impl Into<PermissionRequirement>,
    ) -> Self {
        let key = key.into();
        let name = format!("{}.{}", self.name, key);
        self.actions.insert(key, ActionDef::new(name, permissions));
        self
    }

    /// Fill in missing action names as "<service>.<key>".
    pub fn qualify_names(&mut self) {
        for (key, action) in self.actions.iter_mut() {
            if action.name.is_empty() {
                action.name = format!("{}.{}", self.name, key);
            }
        }
    }

    /// Find an action by its qualified name.
    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.values().find(|a| a.name == name)
    }
}

/// A list of services described in a YAML or JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceCatalog {
    #[serde(default)]
    pub services: Vec<ServiceDef>,
}

impl ServiceCatalog {
    /// Parse a catalog and qualify any unnamed actions.
    pub fn from_yaml_str(content: &str) -> Result<Self, GuardError> {
        let mut catalog: ServiceCatalog = serde_yaml::from_str(content)?;
        catalog.services.iter_mut().for_each(ServiceDef::qualify_names);
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, GuardError> {
        let content = std::fs::read_to_string(path).map_err(|source| GuardError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Find an action by qualified name across all services.
    pub fn find_action(&self, name: &str) -> Option<&ActionDef> {
        self.services.iter().find_map(|s| s.action(name))
    }
}

/// Turn an action name into a permission tag: every "." becomes `sep`.
pub fn sanitize_name(action_name: &str, sep: &str) -> String {
    action_name.replace('.', sep)
}
