//! forge::mock
//!
//! Mock release host for deterministic testing.
//!
//! # Example
//!
//! ```
//! use reposync::forge::mock::MockReleaseHost;
//! use reposync::forge::{CreateReleaseRequest, ReleaseHost};
//!
//! # tokio_test::block_on(async {
//! let host = MockReleaseHost::new();
//! host.create_release(CreateReleaseRequest {
//!     tag_name: "v1.0".to_string(),
//!     name: "First".to_string(),
//!     body: String::new(),
//!     target: "main".to_string(),
//! }).await.unwrap();
//!
//! let releases = host.list_releases().await.unwrap();
//! assert_eq!(releases[0].tag_name, "v1.0");
//! # });
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::traits::{CreateReleaseRequest, ForgeError, Release, ReleaseHost};

/// Mock release host. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockReleaseHost {
    inner: Arc<Mutex<MockReleaseHostInner>>,
}

#[derive(Debug, Default)]
struct MockReleaseHostInner {
    /// Newest first
    releases: Vec<Release>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// Which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    ListReleases(ForgeError),
    CreateRelease(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ListReleases,
    CreateRelease { tag_name: String, target: String },
}

impl MockReleaseHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with existing releases, given newest first.
    pub fn with_releases(releases: Vec<Release>) -> Self {
        let host = Self::new();
        host.lock().releases = releases;
        host
    }

    /// Configure the mock to fail on an operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// All recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockReleaseHostInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Build a release record as the mock host reports it.
pub fn release(tag_name: &str, name: &str) -> Release {
    Release {
        tag_name: tag_name.to_string(),
        name: name.to_string(),
        body: String::new(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
        html_url: format!("https://github.com/mock/repo/releases/tag/{tag_name}"),
    }
}

#[async_trait]
impl ReleaseHost for MockReleaseHost {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_releases(&self) -> Result<Vec<Release>, ForgeError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::ListReleases);
        if let Some(FailOn::ListReleases(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        Ok(inner.releases.clone())
    }

    async fn create_release(&self, request: CreateReleaseRequest) -> Result<Release, ForgeError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::CreateRelease {
            tag_name: request.tag_name.clone(),
            target: request.target.clone(),
        });
        if let Some(FailOn::CreateRelease(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        if inner.releases.iter().any(|r| r.tag_name == request.tag_name) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: "Validation Failed: already_exists".to_string(),
            });
        }

        let created = Release {
            body: request.body,
            ..release(&request.tag_name, &request.name)
        };
        inner.releases.insert(0, created.clone());
        Ok(created)
    }
}
