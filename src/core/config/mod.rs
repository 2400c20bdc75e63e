//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Per-project overrides
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$REPOSYNC_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/reposync/config.toml`
//! 3. `~/.reposync/config.toml` (canonical write location)
//!
//! # Repo Config Location
//!
//! `.git/reposync/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use reposync::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! println!("auto-save: {}", config.auto_save());
//! println!("poll every {:?}", config.poll_interval());
//! ```

pub mod schema;

pub use schema::{ForgeConfig, GlobalConfig, RepoConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Default background fetch interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown config key: {0}")]
    UnknownKey(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Missing files are not an error; defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated.
    pub fn load(repo_path: Option<&Path>) -> Result<Config, ConfigError> {
        let global_path = Self::find_global();
        Self::load_from(global_path.as_deref(), repo_path)
    }

    /// Load configuration from an explicit global file and project directory.
    pub fn load_from(
        global_path: Option<&Path>,
        repo_path: Option<&Path>,
    ) -> Result<Config, ConfigError> {
        let global = match global_path {
            Some(path) if path.exists() => read_toml::<GlobalConfig>(path)?,
            _ => GlobalConfig::default(),
        };

        let repo = match repo_path {
            Some(path) => {
                let file = Self::repo_config_path(path);
                if file.exists() {
                    Some(read_toml::<RepoConfig>(&file)?)
                } else {
                    None
                }
            }
            None => None,
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(Config { global, repo })
    }

    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("REPOSYNC_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("reposync/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".reposync/config.toml"))
            .filter(|path| path.exists())
    }

    /// Canonical path for global config (`~/.reposync/config.toml`).
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".reposync/config.toml"))
    }

    /// Canonical path for repo config relative to the project directory.
    pub fn repo_config_path(repo_path: &Path) -> PathBuf {
        repo_path.join(".git/reposync/config.toml")
    }

    /// Write repo config atomically.
    pub fn write_repo(repo_path: &Path, config: &RepoConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::repo_config_path(repo_path);
        write_toml_atomic(&path, config)?;
        Ok(path)
    }

    /// Set a single repo-scoped key and persist it.
    ///
    /// Supported keys: `auto_save`, `poll_interval_secs`, `remote`,
    /// `forge.provider`, `forge.api_base`.
    pub fn set_repo_value(repo_path: &Path, key: &str, value: &str) -> Result<PathBuf, ConfigError> {
        let file = Self::repo_config_path(repo_path);
        let mut repo = if file.exists() {
            read_toml::<RepoConfig>(&file)?
        } else {
            RepoConfig::default()
        };

        match key {
            "auto_save" => repo.auto_save = Some(parse_bool(value)?),
            "poll_interval_secs" => {
                repo.poll_interval_secs = Some(value.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("expected seconds, got '{value}'"))
                })?)
            }
            "remote" => repo.remote = Some(value.to_string()),
            "forge.provider" => {
                repo.forge.get_or_insert_with(Default::default).provider = Some(value.to_string())
            }
            "forge.api_base" => {
                repo.forge.get_or_insert_with(Default::default).api_base = Some(value.to_string())
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }

        Self::write_repo(repo_path, &repo)
    }

    /// Look up an effective value by key, for display.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        match key {
            "auto_save" => Ok(self.auto_save().to_string()),
            "poll_interval_secs" => Ok(self.poll_interval().as_secs().to_string()),
            "remote" => Ok(self.remote().to_string()),
            "forge.provider" => Ok(self.forge_provider().unwrap_or_default().to_string()),
            "forge.api_base" => Ok(self.forge_api_base().unwrap_or_default().to_string()),
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Whether guarded operations push automatically. Defaults to `false`.
    pub fn auto_save(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.auto_save)
            .or(self.global.auto_save)
            .unwrap_or(false)
    }

    /// Background fetch interval. Defaults to 60 seconds.
    pub fn poll_interval(&self) -> Duration {
        self.repo
            .as_ref()
            .and_then(|r| r.poll_interval_secs)
            .or(self.global.poll_interval_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// Remote name. Defaults to "origin".
    pub fn remote(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Explicit forge provider, if configured.
    pub fn forge_provider(&self) -> Option<&str> {
        self.forge_field(|f| f.provider.as_deref())
    }

    /// Forge API base URL, if configured.
    pub fn forge_api_base(&self) -> Option<&str> {
        self.forge_field(|f| f.api_base.as_deref())
    }

    fn forge_field<'a>(&'a self, get: impl Fn(&'a ForgeConfig) -> Option<&'a str>) -> Option<&'a str> {
        self.repo
            .as_ref()
            .and_then(|r| r.forge.as_ref())
            .and_then(&get)
            .or_else(|| self.global.forge.as_ref().and_then(&get))
    }
}

fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "expected a boolean, got '{value}'"
        ))),
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write a TOML file via temp file + rename.
fn write_toml_atomic<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ConfigError::WriteError { path, source }
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err(path))?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let temp_path = path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(write_err(&temp_path))?;
    file.write_all(contents.as_bytes())
        .map_err(write_err(&temp_path))?;
    file.sync_all().map_err(write_err(&temp_path))?;

    fs::rename(&temp_path, path).map_err(write_err(path))?;

    Ok(())
}
