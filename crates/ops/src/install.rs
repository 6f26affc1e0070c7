//! Install command implementation
//!
//! Preflight, resolve, fetch, then hand the archive to `pinst_install`
//! for verification, placement and the smoke test.

use crate::formula::{check_requirements, plan, Plan};
use crate::resolve::locate;
use crate::{dir_on_path, InstallReport, InstallRequest, OpsCtx};
use pinst_errors::Error;
use pinst_events::{AppEvent, EventEmitter, FailureContext, InstallEvent};
use pinst_install::{check_destination, install_archive, or_cancelled, PhaseTracker};
use pinst_types::{FailureKind, InstallPhase, InstallResult, SmokeTestOutcome, Verification};
use std::time::Instant;

/// Install one package
///
/// # Errors
///
/// Returns the first stage error. The destination keeps its previous
/// content on every error path; a failed smoke test is a warning, not an
/// error.
pub async fn install(ctx: &OpsCtx, request: &InstallRequest) -> Result<InstallReport, Error> {
    let start = Instant::now();
    ctx.tx.emit_operation_started("install");

    let plan = match plan(ctx, request).await {
        Ok(plan) => plan,
        Err(e) => {
            ctx.tx.emit_operation_failed("install", &e);
            return Err(e);
        }
    };

    let mut tracker = PhaseTracker::new(&plan.spec.identifier, Some(ctx.tx.clone()));
    match run(ctx, &plan, &mut tracker).await {
        Ok(result) => {
            let duration = start.elapsed();
            ctx.tx.emit(AppEvent::Install(InstallEvent::Completed {
                package: result.package.clone(),
                version: result.version.clone(),
                path: result.path.clone(),
                duration,
            }));
            ctx.tx.emit_operation_completed("install", true);
            Ok(report(&plan, result, duration))
        }
        Err(e) => {
            tracker.fail(FailureKind::from(&e));
            ctx.tx.emit(AppEvent::Install(InstallEvent::Failed {
                package: plan.spec.identifier.clone(),
                failure: FailureContext::from_error(&e),
            }));
            ctx.tx.emit_operation_failed("install", &e);
            Err(e)
        }
    }
}

async fn run(
    ctx: &OpsCtx,
    plan: &Plan,
    tracker: &mut PhaseTracker,
) -> Result<InstallResult, Error> {
    let cancel = &ctx.cancel;
    or_cancelled(cancel, check_destination(&plan.target)).await?;

    let release = or_cancelled(cancel, locate(ctx, plan)).await?;
    let algorithm = release
        .checksum
        .as_ref()
        .map(pinst_types::Checksum::algorithm)
        .unwrap_or_default();

    // dropping a fetch removes its scoped download directory
    let fetch = ctx.fetcher.fetch(&release.url, algorithm, &ctx.tx);
    let archive = or_cancelled(cancel, fetch).await?;
    tracker.advance(InstallPhase::Fetched)?;

    install_archive(&archive, &release, &plan.target, &plan.options, tracker).await
}

fn report(plan: &Plan, result: InstallResult, duration: std::time::Duration) -> InstallReport {
    let mut warnings = Vec::new();

    if let Verification::Unverified(digest) = &result.verification {
        warnings.push(format!(
            "no checksum pinned for {} {}; archive digest is {digest}",
            result.package, result.version
        ));
    }
    if let SmokeTestOutcome::Failed { reason } = &result.smoke_test {
        warnings.push(format!("smoke test failed: {reason}"));
    }

    let (caveats, missing_requirements) = match &plan.formula {
        Some(loaded) => {
            let missing: Vec<String> = check_requirements(&loaded.formula.depends_on)
                .into_iter()
                .filter(|r| r.found.is_none())
                .map(|r| r.name)
                .collect();
            (
                loaded.formula.render_caveats(&plan.target.directory),
                missing,
            )
        }
        None => (None, Vec::new()),
    };
    for name in &missing_requirements {
        warnings.push(format!("requires `{name}`, which is not on PATH"));
    }
    for warning in &warnings {
        tracing::warn!(package = %result.package, "{warning}");
    }

    InstallReport {
        on_path: dir_on_path(&plan.target.directory),
        result,
        warnings,
        caveats,
        missing_requirements,
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    }
}
