#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for pinst
//!
//! This crate provides the data model shared by every pipeline stage:
//! package specifications, checksums, formulas, install targets and results.

pub mod checksum;
pub mod formula;
pub mod install;
pub mod package;
pub mod version;

// Re-export commonly used types
pub use checksum::{Checksum, HashAlgorithm};
pub use formula::{Formula, FormulaInstall};
pub use install::{
    FailureKind, InstallPhase, InstallResult, InstallTarget, SmokeTest, SmokeTestOutcome,
    Verification, DEFAULT_MAX_ENTRY_SIZE, DEFAULT_MODE, MODE_MASK,
};
pub use package::{validate_identifier, PackageSpec, PinnedChecksum, ResolvedRelease};
pub use semver::Version;
pub use version::{parse_tag, ReleaseTag, VersionSelector};

use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    #[default]
    Tty,
    Json,
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

// Implement clap::ValueEnum for ColorChoice
impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}
