//! Requests and reports exchanged with the CLI

use pinst_types::InstallResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the user asked for; every field but the identifier is optional
/// and falls back to the formula, then to configuration
#[derive(Clone, Debug, Default)]
pub struct InstallRequest {
    pub identifier: String,
    /// `latest` or a tag such as `v1.0.0`
    pub version: Option<String>,
    /// URL template overriding the formula's
    pub url: Option<String>,
    pub checksum: Option<String>,
    pub entry: Option<String>,
    pub bin: Option<String>,
    pub formula: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub skip_smoke_test: bool,
}

impl InstallRequest {
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }
}

/// Outcome of a successful install
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstallReport {
    pub result: InstallResult,
    /// Non-fatal problems: unverified archive, failed smoke test, missing requirements
    pub warnings: Vec<String>,
    pub caveats: Option<String>,
    pub missing_requirements: Vec<String>,
    /// Whether the destination directory is on `PATH`
    pub on_path: bool,
    /// Execution time in milliseconds
    pub duration_ms: u64,
}

/// A runtime requirement and where it was found
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub found: Option<PathBuf>,
}

/// Formula metadata for `pinst info`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormulaInfo {
    pub name: String,
    pub desc: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    pub version: Option<String>,
    pub url: String,
    pub pinned: bool,
    pub bin: String,
    pub entry: Option<String>,
    pub destination: PathBuf,
    pub installed: bool,
    pub requirements: Vec<Requirement>,
    pub caveats: Option<String>,
    pub source: PathBuf,
}
