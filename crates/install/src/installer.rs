//! Verify, place and smoke-test one fetched archive

use crate::archive::ArchiveFormat;
use crate::lock::DestinationLock;
use crate::phase::PhaseTracker;
use crate::placement::{persist, stage_entry, StageRequest};
use crate::smoke::run_smoke_test;
use crate::verify::verify;
use pinst_errors::{Error, IntegrityError};
use pinst_events::{AppEvent, EventEmitter, InstallEvent, VerifyEvent};
use pinst_net::FetchedArchive;
use pinst_types::{
    InstallPhase, InstallResult, InstallTarget, ResolvedRelease, SmokeTest, SmokeTestOutcome,
    Verification, DEFAULT_MAX_ENTRY_SIZE,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-install knobs that do not come from the resolved release
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Executable to pick inside the archive
    pub entry: Option<String>,
    /// `None` skips the smoke test
    pub smoke_test: Option<SmokeTest>,
    /// Largest executable extracted from an archive, in bytes
    pub max_entry_size: u64,
    /// Cancelling stops the install at the next safe point
    pub cancel: CancellationToken,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            entry: None,
            smoke_test: None,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            cancel: CancellationToken::new(),
        }
    }
}

/// Race `future` against `cancel`; the future is dropped when cancelled.
///
/// Only for futures whose drop releases everything they hold.
///
/// # Errors
///
/// `Cancelled`, or the future's own error.
pub async fn or_cancelled<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}

/// Take a fetched archive from `Fetched` to `Done`.
///
/// The tracker must already be in `Fetched`. On error the destination holds
/// whatever it held before; the caller records the failure on the tracker.
///
/// # Errors
///
/// Returns `ChecksumMismatch`, `MalformedArchive`, `DestinationLocked`,
/// `Cancelled` or a filesystem error. A failing smoke test is not an error;
/// it is reported in the result.
pub async fn install_archive(
    archive: &FetchedArchive,
    release: &ResolvedRelease,
    target: &InstallTarget,
    options: &InstallOptions,
    tracker: &mut PhaseTracker,
) -> Result<InstallResult, Error> {
    let cancel = &options.cancel;
    let verified = or_cancelled(cancel, verify(archive, release.checksum.as_ref())).await;
    let verification = match verified {
        Ok(verification) => verification,
        Err(e) => {
            if let Error::Integrity(IntegrityError::ChecksumMismatch {
                expected, actual, ..
            }) = &e
            {
                tracker.events().emit(AppEvent::Verify(VerifyEvent::Mismatch {
                    url: archive.url.clone(),
                    expected: expected.clone(),
                    actual: actual.clone(),
                }));
            }
            return Err(e);
        }
    };
    tracker.events().emit(AppEvent::Verify(match &verification {
        Verification::Verified(checksum) => VerifyEvent::Verified {
            url: archive.url.clone(),
            checksum: checksum.to_string(),
        },
        Verification::Unverified(digest) => VerifyEvent::Unverified {
            url: archive.url.clone(),
            digest: digest.to_string(),
        },
    }));
    tracker.advance(InstallPhase::Verified)?;

    let lock = Arc::new(DestinationLock::acquire(target).await?);

    let request = StageRequest {
        archive: archive.path.clone(),
        format: ArchiveFormat::detect(&archive.path)?,
        entry: options.entry.clone(),
        target: target.clone(),
        max_size: options.max_entry_size,
    };
    let staged = stage_entry(request, Arc::clone(&lock), cancel).await?;
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let replaced = persist(staged, target)?;

    let path = target.path();
    tracing::info!(package = %release.identifier, path = %path.display(), replaced, "placed executable");
    tracker.events().emit(AppEvent::Install(InstallEvent::Placed {
        package: release.identifier.clone(),
        path: path.clone(),
        replaced,
    }));
    tracker.advance(InstallPhase::Placed)?;

    let smoke_test = match &options.smoke_test {
        Some(test) => {
            tracker
                .events()
                .emit(AppEvent::Install(InstallEvent::SmokeTestStarted {
                    path: path.clone(),
                    args: test.args.clone(),
                }));
            let outcome =
                or_cancelled(cancel, async { Ok(run_smoke_test(&path, test).await) }).await?;
            tracker
                .events()
                .emit(AppEvent::Install(InstallEvent::SmokeTestCompleted {
                    path: path.clone(),
                    outcome: outcome.clone(),
                }));
            outcome
        }
        None => SmokeTestOutcome::Skipped,
    };
    drop(lock);
    tracker.advance(InstallPhase::Tested)?;
    tracker.advance(InstallPhase::Done)?;

    Ok(InstallResult {
        package: release.identifier.clone(),
        version: release.version.clone(),
        path,
        verification,
        smoke_test,
        phase: tracker.phase(),
    })
}
