//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$REPOSYNC_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/reposync/config.toml`
//! 3. `~/.reposync/config.toml` (canonical write location)
//!
//! # Repo Config
//!
//! Located at `.git/reposync/config.toml`.
//!
//! Both scopes share the same keys; repo values win.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// auto_save = true
/// poll_interval_secs = 120
///
/// [forge]
/// provider = "github"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Push automatically after a guarded operation produced commits
    pub auto_save: Option<bool>,

    /// Background fetch interval in seconds
    pub poll_interval_secs: Option<u64>,

    /// Release hosting settings
    pub forge: Option<ForgeConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.poll_interval_secs)?;
        if let Some(forge) = &self.forge {
            forge.validate()?;
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// auto_save = false
/// remote = "origin"
///
/// [forge]
/// api_base = "https://github.example.com/api/v3"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Push automatically after a guarded operation produced commits
    pub auto_save: Option<bool>,

    /// Background fetch interval in seconds
    pub poll_interval_secs: Option<u64>,

    /// Remote name (default: "origin")
    pub remote: Option<String>,

    /// Release hosting settings
    pub forge: Option<ForgeConfig>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.poll_interval_secs)?;

        if let Some(remote) = &self.remote {
            if remote.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "remote cannot be empty".to_string(),
                ));
            }
        }

        if let Some(forge) = &self.forge {
            forge.validate()?;
        }

        Ok(())
    }
}

fn validate_interval(secs: Option<u64>) -> Result<(), ConfigError> {
    if secs == Some(0) {
        return Err(ConfigError::InvalidValue(
            "poll_interval_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Release hosting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    /// Provider override (auto-detected from the remote URL when unset)
    pub provider: Option<String>,

    /// API base URL (GitHub Enterprise)
    pub api_base: Option<String>,
}

impl ForgeConfig {
    /// Validate the forge configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            let valid = crate::forge::valid_forge_names();
            if !valid.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid forge '{}', must be one of: {}",
                    provider,
                    valid.join(", ")
                )));
            }
        }
        if let Some(api_base) = &self.api_base {
            if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
                return Err(ConfigError::InvalidValue(format!(
                    "forge api_base must be an http(s) URL, got '{}'",
                    api_base
                )));
            }
        }
        Ok(())
    }
}
