//! Resolve command implementation (dry run)

use crate::formula::{plan, Plan};
use crate::{InstallRequest, OpsCtx};
use pinst_errors::Error;
use pinst_events::{AppEvent, EventEmitter, FailureContext, ResolveEvent};
use pinst_install::or_cancelled;
use pinst_resolver::{fetch_index, IndexSource, ReleaseIndex};
use pinst_types::{ResolvedRelease, VersionSelector};

/// Resolve the release a request would install, without downloading the
/// archive or writing to the destination.
///
/// # Errors
///
/// Returns an error if the formula cannot be found, the request is invalid,
/// the release index cannot be fetched or no single release matches.
pub async fn resolve(ctx: &OpsCtx, request: &InstallRequest) -> Result<ResolvedRelease, Error> {
    let plan = plan(ctx, request).await?;
    or_cancelled(&ctx.cancel, locate(ctx, &plan)).await
}

pub(crate) async fn locate(ctx: &OpsCtx, plan: &Plan) -> Result<ResolvedRelease, Error> {
    let identifier = &plan.spec.identifier;
    ctx.tx.emit(AppEvent::Resolve(ResolveEvent::Started {
        identifier: identifier.clone(),
        selector: plan.spec.version.to_string(),
    }));

    let located = load_index(ctx, plan)
        .await
        .and_then(|index| pinst_resolver::resolve(&plan.spec, &index));

    match located {
        Ok(release) => {
            ctx.tx.emit(AppEvent::Resolve(ResolveEvent::Completed {
                identifier: identifier.clone(),
                version: release.version.clone(),
                tag: release.tag.clone(),
                url: release.url.clone(),
                pinned: release.checksum.is_some(),
            }));
            Ok(release)
        }
        Err(e) => {
            ctx.tx.emit(AppEvent::Resolve(ResolveEvent::Failed {
                identifier: identifier.clone(),
                failure: FailureContext::from_error(&e),
            }));
            Err(e)
        }
    }
}

/// An exact version does not need a remote index: when the index cannot be
/// fetched the requested tag is trusted as-is.
async fn load_index(ctx: &OpsCtx, plan: &Plan) -> Result<ReleaseIndex, Error> {
    let identifier = &plan.spec.identifier;
    match fetch_index(&ctx.fetcher, identifier, &plan.index, &ctx.tx).await {
        Err(e)
            if matches!(plan.spec.version, VersionSelector::Exact { .. })
                && matches!(plan.index, IndexSource::Remote(_)) =>
        {
            tracing::warn!(package = %identifier, error = %e, "release index unavailable");
            ctx.tx.emit_warning_with_context(
                format!(
                    "release index unavailable; installing {} unchecked",
                    plan.spec.version
                ),
                e.to_string(),
            );
            Ok(ReleaseIndex::Unknown)
        }
        other => other,
    }
}
