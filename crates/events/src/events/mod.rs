use serde::{Deserialize, Serialize};

use crate::{EventMeta, EventSource};
use pinst_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod download;
pub mod general;
pub mod install;
pub mod resolve;
pub mod verify;

pub use download::*;
pub use general::*;
pub use install::*;
pub use resolve::*;
pub use verify::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Release lookup
    Resolve(ResolveEvent),

    /// Archive transfer, retries included
    Download(DownloadEvent),

    /// Digest comparison
    Verify(VerifyEvent),

    /// Placement, smoke test and phase transitions
    Install(InstallEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Resolve(_) => EventSource::RESOLVE,
            Self::Download(_) => EventSource::DOWNLOAD,
            Self::Verify(_) => EventSource::VERIFY,
            Self::Install(_) => EventSource::INSTALL,
        }
    }

    /// Fresh metadata for this event, stamped at call time
    #[must_use]
    pub fn meta(&self) -> EventMeta {
        EventMeta::new(self.log_level(), self.event_source())
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. } | GeneralEvent::OperationFailed { .. })
            | Self::Resolve(ResolveEvent::Failed { .. })
            | Self::Download(DownloadEvent::Failed { .. })
            | Self::Verify(VerifyEvent::Mismatch { .. })
            | Self::Install(InstallEvent::Failed { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Download(DownloadEvent::Retrying { .. })
            | Self::Verify(VerifyEvent::Unverified { .. })
            | Self::Install(InstallEvent::SmokeTestCompleted {
                outcome: pinst_types::SmokeTestOutcome::Failed { .. },
                ..
            }) => Level::WARN,

            // Debug-level events (internal state)
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Resolve(ResolveEvent::IndexLoaded { .. })
            | Self::Install(InstallEvent::PhaseChanged { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "pinst::events::general",
            Self::Resolve(_) => "pinst::events::resolve",
            Self::Download(_) => "pinst::events::download",
            Self::Verify(_) => "pinst::events::verify",
            Self::Install(_) => "pinst::events::install",
        }
    }
}
