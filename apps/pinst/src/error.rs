//! CLI error handling and exit codes

use std::fmt;

use pinst_errors::UserFacingError;
use pinst_types::FailureKind;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Operations error
    Ops(pinst_errors::Error),
    /// Interrupted by the user
    Cancelled,
    /// I/O error
    Io(std::io::Error),
}

impl CliError {
    /// Failure class used to pick the exit code
    pub fn kind(&self) -> FailureKind {
        match self {
            CliError::Ops(e) => FailureKind::from(e),
            CliError::Cancelled => FailureKind::Cancelled,
            CliError::Io(_) => FailureKind::Internal,
        }
    }

    pub fn exit_code(&self) -> i32 {
        exit_code(self.kind())
    }
}

/// Process exit code for each failure class
pub fn exit_code(kind: FailureKind) -> i32 {
    match kind {
        FailureKind::Usage => 2,
        FailureKind::NotFound => 10,
        FailureKind::AmbiguousVersion => 11,
        FailureKind::Network => 20,
        FailureKind::HttpStatus => 21,
        FailureKind::ChecksumMismatch => 30,
        FailureKind::MalformedArchive => 40,
        FailureKind::Permission => 41,
        FailureKind::PostInstallVerification | FailureKind::Install => 42,
        FailureKind::Cancelled => 130,
        FailureKind::Internal => 1,
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Ops(e) => {
                write!(f, "{}: {}", e.stage(), e.user_message())?;
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            CliError::Cancelled => write!(f, "cancelled: interrupted before completion"),
            CliError::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Cancelled => None,
        }
    }
}

impl From<pinst_errors::Error> for CliError {
    fn from(e: pinst_errors::Error) -> Self {
        match e {
            pinst_errors::Error::Cancelled => CliError::Cancelled,
            e => CliError::Ops(e),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinst_errors::{Error, InstallError, IntegrityError, ResolveError};

    #[test]
    fn test_exit_codes_are_distinct_per_stage() {
        let mismatch: CliError = Error::from(IntegrityError::ChecksumMismatch {
            algorithm: "sha256".into(),
            expected: "deadbeef".into(),
            actual: "00".into(),
        })
        .into();
        assert_eq!(mismatch.exit_code(), 30);

        let locked: CliError = Error::from(InstallError::DestinationLocked {
            path: "/tmp/bin/demo".into(),
        })
        .into();
        assert_eq!(locked.exit_code(), 42);

        let missing: CliError = Error::from(ResolveError::FormulaNotFound {
            identifier: "demo".into(),
            searched: "/nowhere".into(),
        })
        .into();
        assert_eq!(missing.exit_code(), 10);

        assert_eq!(CliError::from(Error::Cancelled).exit_code(), 130);
    }

    #[test]
    fn test_display_names_stage_and_hint() {
        let err: CliError = Error::from(InstallError::MalformedArchive {
            message: "2 candidate executables (a, b); pick one with --entry".into(),
        })
        .into();
        let text = err.to_string();
        let mut lines = text.lines();
        assert!(lines.next().is_some_and(|l| l.contains("2 candidate executables")));
        assert!(lines.next().is_some_and(|l| l.trim_start().starts_with("Hint:")));
    }
}
