//! forge::github
//!
//! GitHub release hosting over the REST API.
//!
//! # Authentication
//!
//! Listing releases of a public repository works anonymously; creating a
//! release requires a token. The token is passed in by the factory, which
//! reads it from the environment.
//!
//! # Rate Limiting
//!
//! Returns `ForgeError::RateLimited` when limits are hit. Retrying is the
//! caller's responsibility.
//!
//! # Example
//!
//! ```ignore
//! use reposync::forge::github::GitHubReleases;
//! use reposync::forge::ReleaseHost;
//!
//! let host = GitHubReleases::from_remote_url("git@github.com:o/r.git", Some(token)).unwrap();
//! for release in host.list_releases().await? {
//!     println!("{} {}", release.tag_name, release.name);
//! }
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{CreateReleaseRequest, ForgeError, Release, ReleaseHost};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "reposync";

/// Releases fetched per listing request.
const PAGE_SIZE: u32 = 100;

/// GitHub release host.
pub struct GitHubReleases {
    client: Client,
    token: Option<String>,
    owner: String,
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubReleases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubReleases")
            .field("has_token", &self.token.is_some())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubReleases {
    /// Create a host for `owner/repo` on github.com.
    pub fn new(token: Option<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token,
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Use a custom API base URL (GitHub Enterprise, or a test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Create a host from a remote URL.
    ///
    /// Returns `None` if the URL is not a GitHub URL.
    pub fn from_remote_url(url: &str, token: Option<String>) -> Option<Self> {
        let (owner, repo) = parse_github_url(url)?;
        Some(Self::new(token, owner, repo))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn headers(&self, require_token: bool) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        match &self.token {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
                headers.insert(AUTHORIZATION, value);
            }
            None if require_token => return Err(ForgeError::AuthRequired),
            None => {}
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(Self::error_from_response(response, status).await)
        }
    }

    async fn error_from_response(response: Response, status: StatusCode) -> ForgeError {
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if message.to_lowercase().contains("rate limit") => {
                ForgeError::RateLimited
            }
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {message}")),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl ReleaseHost for GitHubReleases {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn list_releases(&self) -> Result<Vec<Release>, ForgeError> {
        let url = self.repo_url("releases");
        debug!(owner = %self.owner, repo = %self.repo, "listing releases");

        let response = self
            .client
            .get(&url)
            .headers(self.headers(false)?)
            .query(&[("per_page", PAGE_SIZE)])
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let releases: Vec<GitHubRelease> = Self::handle_response(response).await?;
        Ok(releases
            .into_iter()
            .filter(|r| !r.draft)
            .map(Release::from)
            .collect())
    }

    async fn create_release(&self, request: CreateReleaseRequest) -> Result<Release, ForgeError> {
        let url = self.repo_url("releases");
        debug!(tag = %request.tag_name, "creating release");

        let body = CreateReleaseBody {
            tag_name: &request.tag_name,
            target_commitish: &request.target,
            name: &request.name,
            body: &request.body,
        };

        let response = self
            .client
            .post(&url)
            .headers(self.headers(true)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let release: GitHubRelease = Self::handle_response(response).await?;
        Ok(release.into())
    }
}

// --------------------------------------------------------------------------
// API Types
// --------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    target_commitish: &'a str,
    name: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    name: Option<String>,
    body: Option<String>,
    created_at: String,
    html_url: String,
    #[serde(default)]
    draft: bool,
}

impl From<GitHubRelease> for Release {
    fn from(gh: GitHubRelease) -> Self {
        Release {
            name: gh.name.unwrap_or_else(|| gh.tag_name.clone()),
            tag_name: gh.tag_name,
            body: gh.body.unwrap_or_default(),
            created_at: gh.created_at,
            html_url: gh.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

// --------------------------------------------------------------------------
// URL Parsing
// --------------------------------------------------------------------------

/// Parse a GitHub remote URL to extract owner and repo.
///
/// Supports both SSH and HTTPS formats:
/// - `git@github.com:owner/repo.git`
/// - `ssh://git@github.com/owner/repo.git`
/// - `https://github.com/owner/repo.git`
/// - `https://github.com/owner/repo`
///
/// # Example
///
/// ```
/// use reposync::forge::github::parse_github_url;
///
/// let (owner, repo) = parse_github_url("git@github.com:octocat/hello-world.git").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// ```
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    let rest = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))?;
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    let (owner, repo) = rest.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
