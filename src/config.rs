//! Optional JSON configuration file.
//!
//! ```json
//! {
//!     "old_base_url": "https://bitbucket.org/birkenfeld/sphinx",
//!     "new_base_url": "https://github.com/sphinx-doc/sphinx",
//!     "known_users": ["birkenfeld", "shimizukawa"],
//!     "extra_denylist": ["media"],
//!     "user_check": "list"
//! }
//! ```
//!
//! Command-line flags take precedence over every field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RelinkError;

/// How `@mentions` are verified before being linked.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UserCheck {
    /// Leave mentions untouched.
    #[default]
    #[serde(rename = "none")]
    #[value(name = "none")]
    Off,
    /// Accept only names from `known_users`.
    List,
    /// Ask the old host whether a profile page exists.
    Http,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    pub old_base_url: Option<String>,
    pub new_base_url: Option<String>,
    pub known_users: Vec<String>,
    pub extra_denylist: Vec<String>,
    pub user_check: UserCheck,
}

/// `<config dir>/relink/config.json`, e.g. `~/.config/relink/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("relink").join("config.json"))
}

impl MigrationConfig {
    pub fn load(path: &Path) -> Result<Self, RelinkError> {
        let invalid = |message: String| RelinkError::InvalidConfig {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(format!("cannot read: {}", e)))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load `explicit` if given (it must exist), otherwise the default path
    /// if present, otherwise an empty configuration.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, RelinkError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}
