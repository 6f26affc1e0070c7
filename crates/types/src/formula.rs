//! Formula: a declarative install recipe for a single tool
//!
//! ```toml
//! name = "slack"
//! desc = "Command-line interface for Slack"
//! homepage = "https://github.com/nitaiaharoni/slack-cli"
//! url = "https://github.com/nitaiaharoni/slack-cli/archive/refs/tags/v{version}.tar.gz"
//! version = "1.0.0"
//! sha256 = ""
//! license = "MIT"
//! depends_on = ["curl", "python3"]
//!
//! [install]
//! entry = "slack-cli.sh"
//! bin = "slack"
//!
//! [test]
//! args = ["help"]
//! expect = "Slack CLI"
//! expect_status = 1
//! ```

use crate::{
    validate_identifier, Checksum, PinnedChecksum, SmokeTest, VersionSelector, DEFAULT_MODE,
    MODE_MASK,
};
use pinst_errors::{Error, ResolveError};
use serde::{Deserialize, Serialize};

/// Parsed formula file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    /// Archive URL template (`{version}`, `{tag}`, `{name}`)
    pub url: String,
    /// Version the formula was written for; the default install version
    #[serde(default)]
    pub version: Option<String>,
    /// Checksum of the archive for `version`; empty means unpinned
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    /// Known release tags, used to resolve `latest` offline
    #[serde(default)]
    pub releases: Vec<String>,
    /// Endpoint listing release tags as a JSON array of `{ "name": tag }`
    #[serde(default)]
    pub releases_url: Option<String>,
    /// Commands that must be on PATH for the tool to work
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub caveats: Option<String>,
    #[serde(default)]
    pub install: FormulaInstall,
    #[serde(default)]
    pub test: Option<SmokeTest>,
}

/// `[install]` table of a formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaInstall {
    #[serde(default)]
    pub entry: Option<String>,
    #[serde(default)]
    pub bin: Option<String>,
    #[serde(default = "default_mode")]
    pub mode: u32,
}

impl Default for FormulaInstall {
    fn default() -> Self {
        Self {
            entry: None,
            bin: None,
            mode: DEFAULT_MODE,
        }
    }
}

fn default_mode() -> u32 {
    DEFAULT_MODE
}

impl Formula {
    /// Parse and validate a formula
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidFormula` for TOML errors, an invalid
    /// name, an unrecognized version or a malformed checksum.
    pub fn from_toml_str(source: &str, contents: &str) -> Result<Self, Error> {
        let formula: Self = toml::from_str(contents).map_err(|e| ResolveError::InvalidFormula {
            path: source.to_string(),
            message: e.to_string(),
        })?;

        let invalid = |message: String| ResolveError::InvalidFormula {
            path: source.to_string(),
            message,
        };

        validate_identifier(&formula.name).map_err(|e| invalid(e.to_string()))?;
        formula
            .declared_version()
            .map_err(|e| invalid(e.to_string()))?;
        formula
            .pinned_checksum()
            .map_err(|e| invalid(e.to_string()))?;
        if formula.install.mode & !MODE_MASK != 0 {
            return Err(invalid(format!(
                "install mode {:o} has bits outside {MODE_MASK:o}",
                formula.install.mode
            ))
            .into());
        }
        if formula.install.mode & 0o100 == 0 {
            return Err(invalid(format!(
                "install mode {:o} is not owner-executable",
                formula.install.mode
            ))
            .into());
        }

        Ok(formula)
    }

    /// The formula's own version, if declared
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidVersion` if the version is not a recognized tag.
    pub fn declared_version(&self) -> Result<Option<VersionSelector>, ResolveError> {
        self.version.as_deref().map(str::parse).transpose()
    }

    /// The formula's checksum, pinned to its declared version
    ///
    /// # Errors
    ///
    /// Returns an error if the checksum or version is malformed.
    pub fn pinned_checksum(&self) -> Result<Option<PinnedChecksum>, Error> {
        let Some(raw) = self.sha256.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        let checksum = Checksum::parse(raw)?;
        let pinned = match self.declared_version()? {
            Some(VersionSelector::Exact { version, .. }) => {
                PinnedChecksum::for_version(checksum, version)
            }
            _ => PinnedChecksum::any(checksum),
        };
        Ok(Some(pinned))
    }

    /// Name of the installed executable
    #[must_use]
    pub fn bin_name(&self) -> &str {
        self.install.bin.as_deref().unwrap_or(&self.name)
    }

    /// Caveats with `{bin}` and `{bin_dir}` substituted
    #[must_use]
    pub fn render_caveats(&self, bin_dir: &std::path::Path) -> Option<String> {
        self.caveats.as_ref().map(|text| {
            let bin_dir = bin_dir.display().to_string();
            text.replace("{bin_dir}", &bin_dir)
                .replace("{bin}", self.bin_name())
                .trim_end()
                .to_string()
        })
    }
}
