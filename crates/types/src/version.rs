//! Release tag parsing and version selection
//!
//! A recognized tag is an optional `v`/`V` prefix followed by a semantic
//! version: `1.2.3`, `v1.2.3`, `v2.0.0-rc.1`, `1.0.0+build.5`.

use pinst_errors::ResolveError;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parse a release tag into its semantic version
///
/// # Errors
///
/// Returns `ResolveError::InvalidVersion` if the tag is not in a recognized format.
pub fn parse_tag(tag: &str) -> Result<Version, ResolveError> {
    let trimmed = tag.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    Version::parse(bare).map_err(|_| ResolveError::InvalidVersion {
        input: tag.to_string(),
    })
}

/// A published release: the tag as it appears upstream and its parsed version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTag {
    pub tag: String,
    pub version: Version,
}

impl ReleaseTag {
    /// Parse a published tag
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidVersion` if the tag is not in a recognized format.
    pub fn parse(tag: &str) -> Result<Self, ResolveError> {
        Ok(Self {
            tag: tag.trim().to_string(),
            version: parse_tag(tag)?,
        })
    }
}

/// Requested version: the newest release or one exact tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionSelector {
    Latest,
    Exact { tag: String, version: Version },
}

impl VersionSelector {
    #[must_use]
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }
}

impl FromStr for VersionSelector {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        let release = ReleaseTag::parse(s)?;
        Ok(Self::Exact {
            tag: release.tag,
            version: release.version,
        })
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Exact { tag, .. } => f.write_str(tag),
        }
    }
}
