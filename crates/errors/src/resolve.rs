//! Release resolution error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("invalid package identifier: '{identifier}'")]
    InvalidIdentifier { identifier: String },

    #[error("invalid version: '{input}' (expected 'latest' or a tag like v1.2.3)")]
    InvalidVersion { input: String },

    #[error("no release of {identifier} matches version {version}")]
    NotFound { identifier: String, version: String },

    #[error("cannot resolve latest {identifier}: {reason}")]
    AmbiguousVersion { identifier: String, reason: String },

    #[error("no formula for {identifier} in {searched}")]
    FormulaNotFound { identifier: String, searched: String },

    #[error("invalid formula {path}: {message}")]
    InvalidFormula { path: String, message: String },

    #[error("invalid URL template '{template}': {message}")]
    InvalidTemplate { template: String, message: String },
}

impl UserFacingError for ResolveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidIdentifier { .. } => {
                Some("Identifiers may contain letters, digits, '.', '_' and '-'.")
            }
            Self::InvalidVersion { .. } => Some("Use 'latest' or a tag such as 1.0.0 or v1.0.0."),
            Self::NotFound { .. } => Some("Run `pinst resolve <name> --version latest` to see the newest release."),
            Self::AmbiguousVersion { .. } => {
                Some("Pass an exact --version; the release list cannot pick one deterministically.")
            }
            Self::FormulaNotFound { .. } => {
                Some("Pass --formula <file> or --url <template> to install without a formula.")
            }
            Self::InvalidFormula { .. } | Self::InvalidTemplate { .. } => {
                Some("Fix the formula file and retry.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidIdentifier { .. } => "resolve.invalid_identifier",
            Self::InvalidVersion { .. } => "resolve.invalid_version",
            Self::NotFound { .. } => "resolve.not_found",
            Self::AmbiguousVersion { .. } => "resolve.ambiguous_version",
            Self::FormulaNotFound { .. } => "resolve.formula_not_found",
            Self::InvalidFormula { .. } => "resolve.invalid_formula",
            Self::InvalidTemplate { .. } => "resolve.invalid_template",
        };
        Some(code)
    }
}
