//! forge::factory
//!
//! Release host selection and creation.
//!
//! # Design
//!
//! Callers use [`create_release_host`] instead of importing a specific host
//! implementation. A remote that is not on a recognized forge simply has no
//! release host; the workflow layer treats that as "releases unavailable".
//!
//! # Provider Detection
//!
//! - GitHub URLs (`github.com`) → `GitHubReleases`
//! - Any URL with an explicit `provider = "github"` override and an
//!   `api_base` → `GitHubReleases` against that API (GitHub Enterprise)
//!
//! # Example
//!
//! ```ignore
//! use reposync::forge::{create_release_host, token_from_env};
//!
//! let host = create_release_host(
//!     "git@github.com:owner/repo.git",
//!     token_from_env(),
//!     None,
//!     None,
//! )?;
//! let releases = host.list_releases().await?;
//! ```

use std::sync::Arc;

use super::github::{parse_github_url, GitHubReleases};
use super::traits::{ForgeError, ReleaseHost};

/// Environment variables consulted for an API token, in order.
pub const TOKEN_ENV_VARS: &[&str] = &["REPOSYNC_TOKEN", "GITHUB_TOKEN"];

/// Supported forge providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeProvider {
    GitHub,
}

impl ForgeProvider {
    /// All available providers.
    pub fn all() -> &'static [ForgeProvider] {
        &[ForgeProvider::GitHub]
    }

    /// Provider name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ForgeProvider::GitHub => "github",
        }
    }

    /// Parse a provider from a string.
    ///
    /// ```
    /// use reposync::forge::ForgeProvider;
    ///
    /// assert_eq!(ForgeProvider::parse("GitHub"), Some(ForgeProvider::GitHub));
    /// assert_eq!(ForgeProvider::parse("bitbucket"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "github" => Some(ForgeProvider::GitHub),
            _ => None,
        }
    }
}

impl std::fmt::Display for ForgeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the forge provider from a remote URL.
///
/// ```
/// use reposync::forge::{detect_provider, ForgeProvider};
///
/// assert_eq!(
///     detect_provider("git@github.com:owner/repo.git"),
///     Some(ForgeProvider::GitHub)
/// );
/// assert_eq!(detect_provider("/srv/git/review.git"), None);
/// ```
pub fn detect_provider(remote_url: &str) -> Option<ForgeProvider> {
    parse_github_url(remote_url).map(|_| ForgeProvider::GitHub)
}

/// First non-empty token from [`TOKEN_ENV_VARS`].
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|token| !token.trim().is_empty())
}

/// Create a release host for a remote.
///
/// # Errors
///
/// - `ForgeError::UnsupportedRemote` if no provider matches the URL
/// - `ForgeError::NotFound` if the override names an unknown provider
pub fn create_release_host(
    remote_url: &str,
    token: Option<String>,
    provider_override: Option<&str>,
    api_base: Option<&str>,
) -> Result<Arc<dyn ReleaseHost>, ForgeError> {
    let provider = match provider_override {
        Some(name) => ForgeProvider::parse(name).ok_or_else(|| {
            ForgeError::NotFound(format!(
                "Unknown forge provider '{}'. Available providers: {}",
                name,
                valid_forge_names().join(", ")
            ))
        })?,
        None => detect_provider(remote_url)
            .ok_or_else(|| ForgeError::UnsupportedRemote(remote_url.to_string()))?,
    };

    match provider {
        ForgeProvider::GitHub => {
            let (owner, repo) = parse_github_url(remote_url)
                .or_else(|| parse_owner_repo(remote_url))
                .ok_or_else(|| ForgeError::UnsupportedRemote(remote_url.to_string()))?;
            let mut host = GitHubReleases::new(token, owner, repo);
            if let Some(base) = api_base {
                host = host.with_api_base(base);
            }
            Ok(Arc::new(host))
        }
    }
}

/// Owner and repository from an arbitrary-host remote URL
/// (`git@host:owner/repo.git`, `https://host/owner/repo`).
fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let path = if let Some((_, rest)) = url.split_once("://") {
        rest.split_once('/')?.1
    } else {
        let (host, path) = url.split_once(':')?;
        if host.contains('/') {
            return None;
        }
        path
    };
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.rsplit_once('/')?;
    let owner = owner.rsplit('/').next()?;
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Valid forge names for configuration validation.
pub fn valid_forge_names() -> &'static [&'static str] {
    &["github"]
}
