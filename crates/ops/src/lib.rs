#![warn(clippy::pedantic)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations for pinst
//!
//! This crate sits between the CLI and the pipeline crates. Each operation
//! takes an [`OpsCtx`] carrying configuration, the network client and the
//! event channel, and drives resolver, fetcher and installer in order.

mod context;
mod formula;
mod info;
mod install;
mod resolve;
mod types;

pub use context::{OpsContextBuilder, OpsCtx};
pub use info::info;
pub use install::install;
pub use resolve::resolve;
pub use types::{FormulaInfo, InstallReport, InstallRequest, Requirement};

use pinst_errors::Error;
use pinst_types::ResolvedRelease;

/// Operation result that can be serialized for CLI output
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationResult {
    InstallReport(InstallReport),
    /// Dry-run resolution
    Resolved(ResolvedRelease),
    FormulaInfo(FormulaInfo),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::internal(e.to_string()))
    }
}

/// Whether `dir` is one of the entries of `$PATH`
#[must_use]
pub fn dir_on_path(dir: &std::path::Path) -> bool {
    std::env::var_os("PATH")
        .is_some_and(|paths| std::env::split_paths(&paths).any(|entry| entry == dir))
}
