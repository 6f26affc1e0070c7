//! Structured logging integration for events
//!
//! Mirrors every `AppEvent` into tracing with its metadata as fields, so
//! `--debug` log files carry the full pipeline history.

use pinst_events::{
    AppEvent, DownloadEvent, EventMeta, GeneralEvent, InstallEvent, ResolveEvent, VerifyEvent,
};
use tracing::{debug, error, info, warn, Level};

macro_rules! at_level {
    ($level:expr, $($arg:tt)+) => {
        if $level == Level::ERROR {
            error!($($arg)+)
        } else if $level == Level::WARN {
            warn!($($arg)+)
        } else if $level == Level::INFO {
            info!($($arg)+)
        } else {
            debug!($($arg)+)
        }
    };
}

/// Log an `AppEvent` at its own level with structured fields
pub fn log_event_with_tracing(event: &AppEvent, meta: &EventMeta) {
    let level = meta.tracing_level();
    let source = meta.source.as_str();
    let event_id = meta.event_id;
    let correlation = meta.correlation_id.as_deref();

    match event {
        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message, context } => {
                at_level!(level, source, %event_id, ?correlation, ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                at_level!(level, source, %event_id, ?correlation, ?details, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                at_level!(level, source, %event_id, ?correlation, ?context, "{message}");
            }
            GeneralEvent::OperationStarted { operation } => {
                at_level!(level, source, %event_id, ?correlation, %operation, "Operation started");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                at_level!(level, source, %event_id, ?correlation, %operation, success, "Operation completed");
            }
            GeneralEvent::OperationFailed { operation, failure } => {
                at_level!(
                    level,
                    source,
                    %event_id,
                    ?correlation,
                    %operation,
                    code = ?failure.code,
                    retryable = failure.retryable,
                    message = %failure.message,
                    "Operation failed"
                );
            }
        },

        AppEvent::Resolve(resolve) => match resolve {
            ResolveEvent::Started {
                identifier,
                selector,
            } => {
                at_level!(level, source, %event_id, ?correlation, %identifier, %selector, "Resolving release");
            }
            ResolveEvent::IndexLoaded {
                identifier,
                source: index_source,
                tags,
            } => {
                at_level!(level, source, %event_id, ?correlation, %identifier, %index_source, tags, "Release index loaded");
            }
            ResolveEvent::Completed {
                identifier,
                version,
                tag,
                url,
                pinned,
            } => {
                at_level!(
                    level,
                    source,
                    %event_id,
                    ?correlation,
                    %identifier,
                    %version,
                    %tag,
                    %url,
                    pinned,
                    "Release resolved"
                );
            }
            ResolveEvent::Failed {
                identifier,
                failure,
            } => {
                at_level!(level, source, %event_id, ?correlation, %identifier, code = ?failure.code, message = %failure.message, "Resolution failed");
            }
        },

        AppEvent::Download(download) => match download {
            DownloadEvent::Started {
                url,
                total_size,
                attempt,
            } => {
                at_level!(level, source, %event_id, ?correlation, %url, ?total_size, attempt, "Download started");
            }
            DownloadEvent::Retrying {
                url,
                attempt,
                max_attempts,
                reason,
                backoff_delay,
            } => {
                at_level!(
                    level,
                    source,
                    %event_id,
                    ?correlation,
                    %url,
                    attempt,
                    max_attempts,
                    %reason,
                    backoff_ms = u64::try_from(backoff_delay.as_millis()).unwrap_or(u64::MAX),
                    "Retrying download"
                );
            }
            DownloadEvent::Completed {
                url,
                final_size,
                total_time,
                hash,
            } => {
                at_level!(
                    level,
                    source,
                    %event_id,
                    ?correlation,
                    %url,
                    final_size,
                    ?total_time,
                    %hash,
                    "Download completed"
                );
            }
            DownloadEvent::Failed {
                url,
                failure,
                attempts,
            } => {
                at_level!(
                    level,
                    source,
                    %event_id,
                    ?correlation,
                    %url,
                    attempts,
                    code = ?failure.code,
                    retryable = failure.retryable,
                    message = %failure.message,
                    "Download failed"
                );
            }
        },

        AppEvent::Verify(verify) => match verify {
            VerifyEvent::Verified { url, checksum } => {
                at_level!(level, source, %event_id, ?correlation, %url, %checksum, "Checksum verified");
            }
            VerifyEvent::Unverified { url, digest } => {
                at_level!(level, source, %event_id, ?correlation, %url, %digest, "No checksum pinned");
            }
            VerifyEvent::Mismatch {
                url,
                expected,
                actual,
            } => {
                at_level!(level, source, %event_id, ?correlation, %url, %expected, %actual, "Checksum mismatch");
            }
        },

        AppEvent::Install(install) => match install {
            InstallEvent::PhaseChanged { package, from, to } => {
                at_level!(level, source, %event_id, ?correlation, %package, %from, %to, "Install phase changed");
            }
            InstallEvent::Placed {
                package,
                path,
                replaced,
            } => {
                at_level!(level, source, %event_id, ?correlation, %package, path = %path.display(), replaced, "Executable placed");
            }
            InstallEvent::SmokeTestStarted { path, args } => {
                at_level!(level, source, %event_id, ?correlation, path = %path.display(), ?args, "Smoke test started");
            }
            InstallEvent::SmokeTestCompleted { path, outcome } => {
                at_level!(level, source, %event_id, ?correlation, path = %path.display(), ?outcome, "Smoke test completed");
            }
            InstallEvent::Completed {
                package,
                version,
                path,
                duration,
            } => {
                at_level!(
                    level,
                    source,
                    %event_id,
                    ?correlation,
                    %package,
                    %version,
                    path = %path.display(),
                    ?duration,
                    "Install completed"
                );
            }
            InstallEvent::Failed { package, failure } => {
                at_level!(
                    level,
                    source,
                    %event_id,
                    ?correlation,
                    %package,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Install failed"
                );
            }
        },
    }
}
