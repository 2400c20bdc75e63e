//! forge::traits
//!
//! Release-hosting trait for remote hosting services.
//!
//! # Design
//!
//! Releases are created through the hosting provider's API, never through
//! raw git, so the tag and its notes appear together on the host. The trait
//! is async because every call is network I/O.
//!
//! Release hosting is informational from the sync layer's point of view: a
//! failing host never compromises the local working copy.
//!
//! # Example
//!
//! ```ignore
//! use reposync::forge::{CreateReleaseRequest, ForgeError, ReleaseHost};
//!
//! async fn publish(host: &dyn ReleaseHost) -> Result<(), ForgeError> {
//!     let release = host
//!         .create_release(CreateReleaseRequest {
//!             tag_name: "v1.1".to_string(),
//!             name: "Second screening round".to_string(),
//!             body: "Adds 42 included records".to_string(),
//!             target: "main".to_string(),
//!         })
//!         .await?;
//!     println!("published {}", release.html_url);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The remote is not hosted on a supported forge.
    #[error("unsupported remote: {0}")]
    UnsupportedRemote(String),
}

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Git tag the release points at (`v1.2`)
    pub tag_name: String,
    /// Human-readable title
    pub name: String,
    /// Release notes
    pub body: String,
    /// RFC3339 creation time as reported by the host
    pub created_at: String,
    /// Web URL for viewing the release
    pub html_url: String,
}

/// Request to create a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReleaseRequest {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    /// Branch the tag is created from when it does not exist yet
    pub target: String,
}

/// A remote host that stores releases.
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait ReleaseHost: Send + Sync {
    /// Forge name (e.g. "github").
    fn name(&self) -> &'static str;

    /// List releases, newest first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository doesn't exist or is not visible
    /// - `AuthFailed` if the token is rejected
    async fn list_releases(&self) -> Result<Vec<Release>, ForgeError>;

    /// Create a release, creating its tag from `target` if needed.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` if no token is configured
    /// - `ApiError` with status 422 if the tag already has a release
    async fn create_release(&self, request: CreateReleaseRequest) -> Result<Release, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forge_error_display() {
        assert_eq!(
            ForgeError::AuthRequired.to_string(),
            "authentication required"
        );
        assert_eq!(
            ForgeError::ApiError {
                status: 422,
                message: "already_exists".into()
            }
            .to_string(),
            "API error: 422 - already_exists"
        );
        assert_eq!(
            ForgeError::UnsupportedRemote("git@example.org:x/y.git".into()).to_string(),
            "unsupported remote: git@example.org:x/y.git"
        );
    }

    #[test]
    fn release_deserializes_from_host_json() {
        let json = r#"{
            "tag_name": "v2.3",
            "name": "Full-text screen",
            "body": "notes",
            "created_at": "2024-05-01T10:00:00Z",
            "html_url": "https://github.com/o/r/releases/tag/v2.3",
            "draft": false
        }"#;
        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.tag_name, "v2.3");
        assert_eq!(release.created_at, "2024-05-01T10:00:00Z");
    }
}
