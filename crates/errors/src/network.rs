//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    ConnectionFailed { url: String, message: String },

    #[error("transfer from {url} failed: {message}")]
    Transfer { url: String, message: String },

    #[error("HTTP error {status} from {url}: {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("cannot read {url}: {message}")]
    FileUnavailable { url: String, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("file size {size} exceeds limit {limit}")]
    FileSizeExceeded { size: u64, limit: u64 },

    #[error("failed to build HTTP client: {0}")]
    ClientSetup(String),
}

impl NetworkError {
    /// Whether this error is an HTTP status failure rather than a transport failure.
    #[must_use]
    pub fn is_http_status(&self) -> bool {
        matches!(self, Self::HttpStatus { .. })
    }
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionFailed { .. } | Self::Transfer { .. } => {
                Some("Check your network connection or raise --timeout / --retries.")
            }
            Self::HttpStatus { status, .. } if *status == 404 => {
                Some("The release archive does not exist; check the version and URL template.")
            }
            Self::HttpStatus { .. } => Some("The release server rejected the request."),
            Self::InvalidUrl(_) | Self::UnsupportedProtocol { .. } => {
                Some("Use an http://, https:// or file:// URL.")
            }
            Self::FileSizeExceeded { .. } => Some("The archive is larger than the configured limit."),
            Self::FileUnavailable { .. } => Some("Check that the local archive path exists and is readable."),
            Self::ClientSetup(_) => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionFailed { .. } | Self::Transfer { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::ConnectionFailed { .. } => "network.connection_failed",
            Self::Transfer { .. } => "network.transfer",
            Self::HttpStatus { .. } => "network.http_status",
            Self::FileUnavailable { .. } => "network.file_unavailable",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::UnsupportedProtocol { .. } => "network.unsupported_protocol",
            Self::FileSizeExceeded { .. } => "network.file_size_exceeded",
            Self::ClientSetup(_) => "network.client_setup",
        };
        Some(code)
    }
}
