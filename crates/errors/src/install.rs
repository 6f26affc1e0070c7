//! Installation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    #[error("malformed archive: {message}")]
    MalformedArchive { message: String },

    #[error("destination not writable: {path}: {message}")]
    PermissionDenied { path: String, message: String },

    #[error("destination is locked by another install: {path}")]
    DestinationLocked { path: String },

    #[error("post-install check `{command}` failed: {reason}")]
    PostInstallVerification { command: String, reason: String },

    #[error("extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("filesystem operation failed: {operation} on {path}: {message}")]
    FilesystemError {
        operation: String,
        path: String,
        message: String,
    },

    #[error("invalid install phase transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("task execution failed: {message}")]
    TaskError { message: String },
}

impl InstallError {
    /// Build a filesystem error, promoting permission failures to `PermissionDenied`.
    #[must_use]
    pub fn from_io(operation: &str, path: &std::path::Path, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                path: path.display().to_string(),
                message: err.to_string(),
            }
        } else {
            Self::FilesystemError {
                operation: operation.to_string(),
                path: path.display().to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MalformedArchive { .. } => {
                Some("Name the executable inside the archive with --entry.")
            }
            Self::PermissionDenied { .. } => {
                Some("Choose a writable --dest or fix the directory permissions.")
            }
            Self::DestinationLocked { .. } => Some(
                "Wait for the other install to finish; remove the stale .pinst.lock file if none is running.",
            ),
            Self::PostInstallVerification { .. } => {
                Some("The artifact is installed but did not pass its smoke test.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::DestinationLocked { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MalformedArchive { .. } => "install.malformed_archive",
            Self::PermissionDenied { .. } => "install.permission_denied",
            Self::DestinationLocked { .. } => "install.destination_locked",
            Self::PostInstallVerification { .. } => "install.post_install_verification",
            Self::ExtractionFailed { .. } => "install.extraction_failed",
            Self::FilesystemError { .. } => "install.filesystem_error",
            Self::InvalidTransition { .. } => "install.invalid_transition",
            Self::TaskError { .. } => "install.task_error",
        };
        Some(code)
    }
}
