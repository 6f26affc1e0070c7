//! Archive integrity error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum IntegrityError {
    #[error("{algorithm} checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("invalid checksum '{input}': {message}")]
    InvalidChecksum { input: String, message: String },
}

impl UserFacingError for IntegrityError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ChecksumMismatch { .. } => Some(
                "The archive is corrupted or was tampered with. Nothing was installed.",
            ),
            Self::InvalidChecksum { .. } => {
                Some("Pass a hex digest, optionally prefixed with sha256: or blake3:.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ChecksumMismatch { .. } => "integrity.checksum_mismatch",
            Self::InvalidChecksum { .. } => "integrity.invalid_checksum",
        };
        Some(code)
    }
}
