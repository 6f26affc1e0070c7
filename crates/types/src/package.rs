//! Package specification and resolved release types

use crate::{Checksum, Version, VersionSelector};
use pinst_errors::{ConfigError, Error, ResolveError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Check that an identifier is non-empty and uses only `[A-Za-z0-9._-]`
///
/// # Errors
///
/// Returns `ResolveError::InvalidIdentifier` otherwise.
pub fn validate_identifier(identifier: &str) -> Result<(), ResolveError> {
    let valid = !identifier.is_empty()
        && identifier != "."
        && identifier != ".."
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(ResolveError::InvalidIdentifier {
            identifier: identifier.to_string(),
        })
    }
}

/// A checksum together with the version it was pinned for.
///
/// A formula's `sha256` only describes the formula's own version; a
/// `--checksum` given on the command line applies to whatever resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedChecksum {
    pub checksum: Checksum,
    pub version: Option<Version>,
}

impl PinnedChecksum {
    /// Pin a checksum for any resolved version
    #[must_use]
    pub fn any(checksum: Checksum) -> Self {
        Self {
            checksum,
            version: None,
        }
    }

    /// Pin a checksum for exactly one version
    #[must_use]
    pub fn for_version(checksum: Checksum, version: Version) -> Self {
        Self {
            checksum,
            version: Some(version),
        }
    }

    /// Whether this pin applies to `version`
    #[must_use]
    pub fn applies_to(&self, version: &Version) -> bool {
        self.version.as_ref().is_none_or(|pinned| pinned == version)
    }
}

/// Everything needed to resolve one installable release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub identifier: String,
    pub version: VersionSelector,
    /// Download URL; may contain `{version}`, `{tag}` and `{name}`
    pub url_template: String,
    pub checksum: Option<PinnedChecksum>,
    /// Archive entry holding the executable, when it is not the only one
    pub entry: Option<String>,
    /// File name of the installed executable
    pub bin_name: String,
}

impl PackageSpec {
    /// Validate the spec once before any stage runs
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid identifier or binary name, or an
    /// empty URL template.
    pub fn validate(&self) -> Result<(), Error> {
        validate_identifier(&self.identifier)?;

        if self.url_template.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "url".to_string(),
            }
            .into());
        }

        let bin_ok = !self.bin_name.is_empty()
            && self.bin_name != "."
            && self.bin_name != ".."
            && !self.bin_name.contains(['/', '\\']);
        if !bin_ok {
            return Err(ConfigError::InvalidValue {
                field: "bin".to_string(),
                value: self.bin_name.clone(),
            }
            .into());
        }

        if let Some(entry) = &self.entry {
            if entry.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "entry".to_string(),
                    value: entry.clone(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// A concrete, downloadable release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRelease {
    pub identifier: String,
    pub version: Version,
    pub tag: String,
    pub url: String,
    pub checksum: Option<Checksum>,
}

impl fmt::Display for ResolvedRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.identifier, self.version, self.url)
    }
}
