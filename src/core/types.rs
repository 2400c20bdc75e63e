//! core::types
//!
//! Strong types for the synchronization domain.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`ReleaseTag`] - Release tag in `v<major>.<minor>` form
//! - [`VersionBump`] - Which component of a release tag to increment
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Examples
//!
//! ```
//! use reposync::core::types::{BranchName, ReleaseTag};
//!
//! let branch = BranchName::new("dev").unwrap();
//! assert_eq!(branch, BranchName::dev());
//!
//! let tag = ReleaseTag::parse("v2.3").unwrap();
//! assert_eq!(tag.to_string(), "v2.3");
//! assert!(ReleaseTag::parse("release-7").is_none());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the stable (published) branch.
pub const STABLE_BRANCH: &str = "main";

/// Name of the development branch.
pub const DEV_BRANCH: &str = "dev";

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid release tag: {0}")]
    InvalidReleaseTag(String),
}

/// A validated Git branch name.
///
/// Follows the `git check-ref-format --branch` rules that matter in practice:
/// no empty names, no leading `.` or `-`, no trailing `/` or `.lock`, no `..`,
/// `@{` or `//`, no spaces or glob/revision characters, no control characters,
/// and not exactly `@`.
///
/// # Example
///
/// ```
/// use reposync::core::types::BranchName;
///
/// assert!(BranchName::new("feature/screening").is_ok());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("x..y").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// The stable branch (`main`).
    pub fn main() -> Self {
        Self(STABLE_BRANCH.to_string())
    }

    /// The development branch (`dev`).
    pub fn dev() -> Self {
        Self(DEV_BRANCH.to_string())
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(format!("'{name}': {why}")));

        if name.is_empty() {
            return reject("cannot be empty");
        }
        if name == "@" {
            return reject("'@' is reserved");
        }
        if name.starts_with('-') {
            return reject("cannot start with '-'");
        }
        if name.ends_with('/') {
            return reject("cannot end with '/'");
        }
        for seq in ["..", "@{", "//"] {
            if name.contains(seq) {
                return reject(&format!("cannot contain '{seq}'"));
            }
        }
        if let Some(c) = name
            .chars()
            .find(|c| matches!(c, ' ' | '~' | '^' | ':' | '\\' | '?' | '*' | '['))
        {
            return reject(&format!("cannot contain '{c}'"));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("cannot contain control characters");
        }
        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the stable branch.
    pub fn is_main(&self) -> bool {
        self.0 == STABLE_BRANCH
    }

    /// Whether this is the development branch.
    pub fn is_dev(&self) -> bool {
        self.0 == DEV_BRANCH
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for BranchName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BranchName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which component of a release version to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionBump {
    /// `v2.3` -> `v2.4`
    #[default]
    Minor,
    /// `v2.3` -> `v3.0`
    Major,
}

impl std::fmt::Display for VersionBump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionBump::Minor => write!(f, "minor"),
            VersionBump::Major => write!(f, "major"),
        }
    }
}

/// A release tag of the form `v<major>.<minor>`.
///
/// Tags in any other shape are not release tags as far as version
/// computation is concerned; [`ReleaseTag::parse`] returns `None` for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseTag {
    pub major: u32,
    pub minor: u32,
}

impl ReleaseTag {
    /// The first release.
    pub const INITIAL: ReleaseTag = ReleaseTag { major: 1, minor: 0 };

    /// Parse a `v<major>.<minor>` tag. Returns `None` for anything else.
    ///
    /// ```
    /// use reposync::core::types::ReleaseTag;
    ///
    /// assert_eq!(ReleaseTag::parse("v10.2"), Some(ReleaseTag { major: 10, minor: 2 }));
    /// assert_eq!(ReleaseTag::parse("v1"), None);
    /// assert_eq!(ReleaseTag::parse("v1.2.3"), None);
    /// ```
    pub fn parse(tag: &str) -> Option<Self> {
        let rest = tag.strip_prefix('v')?;
        let (major, minor) = rest.split_once('.')?;
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(major) || !all_digits(minor) {
            return None;
        }
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    /// Compute the tag that follows this one.
    ///
    /// `None` when the bumped component would overflow.
    pub fn bump(self, bump: VersionBump) -> Option<Self> {
        match bump {
            VersionBump::Minor => Some(Self {
                major: self.major,
                minor: self.minor.checked_add(1)?,
            }),
            VersionBump::Major => Some(Self {
                major: self.major.checked_add(1)?,
                minor: 0,
            }),
        }
    }
}

impl std::str::FromStr for ReleaseTag {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TypeError::InvalidReleaseTag(s.to_string()))
    }
}

impl std::fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// A UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("feature/foo").is_ok());
            assert!(BranchName::new("user@feature").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
        }

        #[test]
        fn invalid_branch_names() {
            for bad in [
                "", "@", "-flag", ".hidden", "foo/.hidden", "branch.lock", "a/b.lock", "trail/",
                "a..b", "a@{b", "a//b", "has space", "tilde~", "caret^", "colon:", "q?", "star*",
                "br[", "ctl\x07",
            ] {
                assert!(BranchName::new(bad).is_err(), "{bad:?} should be rejected");
            }
        }

        #[test]
        fn well_known_branches() {
            assert!(BranchName::main().is_main());
            assert!(BranchName::dev().is_dev());
            assert!(!BranchName::dev().is_main());
            assert_eq!(BranchName::dev(), "dev");
        }

        #[test]
        fn serde_validates() {
            let ok: Result<BranchName, _> = serde_json::from_str("\"dev\"");
            assert!(ok.is_ok());
            let bad: Result<BranchName, _> = serde_json::from_str("\"a..b\"");
            assert!(bad.is_err());
        }
    }

    mod release_tag {
        use super::*;

        #[test]
        fn parses_major_minor() {
            assert_eq!(
                ReleaseTag::parse("v2.3"),
                Some(ReleaseTag { major: 2, minor: 3 })
            );
            assert_eq!(
                ReleaseTag::parse("v0.0"),
                Some(ReleaseTag { major: 0, minor: 0 })
            );
        }

        #[test]
        fn rejects_other_shapes() {
            for bad in ["release-7", "2.3", "v2", "v2.", "v.3", "v2.3.1", "v2.x", "V2.3", "v-1.0"] {
                assert_eq!(ReleaseTag::parse(bad), None, "{bad}");
            }
        }

        #[test]
        fn bump_minor_and_major() {
            let tag = ReleaseTag { major: 2, minor: 3 };
            assert_eq!(tag.bump(VersionBump::Minor).unwrap().to_string(), "v2.4");
            assert_eq!(tag.bump(VersionBump::Major).unwrap().to_string(), "v3.0");
        }

        #[test]
        fn bump_past_u32_max_is_none() {
            let top_minor = ReleaseTag { major: 4, minor: u32::MAX };
            assert_eq!(top_minor.bump(VersionBump::Minor), None);
            assert_eq!(
                top_minor.bump(VersionBump::Major),
                Some(ReleaseTag { major: 5, minor: 0 })
            );

            let top_major = ReleaseTag { major: u32::MAX, minor: 0 };
            assert_eq!(top_major.bump(VersionBump::Major), None);
        }

        #[test]
        fn from_str_reports_invalid() {
            let err = "nope".parse::<ReleaseTag>().unwrap_err();
            assert_eq!(err, TypeError::InvalidReleaseTag("nope".into()));
        }
    }
}
