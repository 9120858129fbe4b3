//! State machine manager configuration
//!
//! The manager has a single setting, the name of the default Action started
//! for entities that call `update` without an active workflow. It can come
//! from a YAML or TOML file, from environment variables, or be set in code;
//! sources are combined with [`ManagerConfig::merge`].
//!
//! ```yaml
//! default_action: Idle
//! ```
//!
//! ```rust
//! use actionfsm::ManagerConfig;
//!
//! let config = ManagerConfig::from_yaml_str("default_action: Idle").unwrap();
//! assert_eq!(config.default_action(), Some("Idle"));
//!
//! // An empty name disables the fallback
//! let config = ManagerConfig::from_toml_str("default_action = \"\"").unwrap();
//! assert_eq!(config.default_action(), None);
//! ```

use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable suffix holding the default Action name
pub const DEFAULT_ACTION_VAR: &str = "DEFAULT_ACTION";

/// Configuration for [`StateMachineManager`](crate::StateMachineManager)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Action started by `update` for entities with no active workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_action: Option<String>,
}

impl ManagerConfig {
    /// Configuration without a default Action
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default Action name
    pub fn with_default_action(mut self, name: impl Into<String>) -> Self {
        self.default_action = Some(name.into());
        self
    }

    /// Default Action name, if one is enabled
    ///
    /// Empty and whitespace-only names count as disabled.
    pub fn default_action(&self) -> Option<&str> {
        self.default_action
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self.default_action() {
            if name.trim() != name {
                return Err(WorkflowError::Configuration(format!(
                    "default action '{}' has leading or trailing whitespace",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Overlay `other` on top of this configuration
    ///
    /// Fields set in `other` win.
    pub fn merge(&mut self, other: Self) -> &mut Self {
        if other.default_action.is_some() {
            self.default_action = other.default_action;
        }
        self
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a `.yaml`, `.yml` or `.toml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content)?,
            Some("toml") => Self::from_toml_str(&content)?,
            other => {
                return Err(WorkflowError::Configuration(format!(
                    "unsupported configuration file extension {:?} for {}",
                    other,
                    path.display()
                )))
            }
        };

        tracing::debug!(path = %path.display(), "Loaded manager configuration");
        Ok(config)
    }

    /// Read settings from `{prefix}DEFAULT_ACTION`
    ///
    /// A missing variable leaves the field unset.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let key = format!("{}{}", prefix, DEFAULT_ACTION_VAR);
        let default_action = match std::env::var(&key) {
            Ok(value) => Some(value),
            Err(std::env::VarError::NotPresent) => None,
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(WorkflowError::Configuration(format!(
                    "Environment variable {} contains invalid UTF-8",
                    key
                )))
            }
        };
        Ok(Self { default_action })
    }

    /// Load `path` if given, overlay the environment, then validate
    pub fn load(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge(Self::from_env(env_prefix)?);
        config.validate()?;
        Ok(config)
    }
}
