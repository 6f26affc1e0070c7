//! Version selection

use crate::index::ReleaseIndex;
use crate::template::expand_url;
use pinst_errors::{Error, ResolveError};
use pinst_types::{PackageSpec, ReleaseTag, ResolvedRelease, VersionSelector};

/// Resolve a package spec against a release index.
///
/// Pure: no I/O, deterministic for a given spec and index.
///
/// # Errors
///
/// - `ResolveError::NotFound` when an exact version is absent from a known index
/// - `ResolveError::AmbiguousVersion` when `latest` has no single answer
/// - `ResolveError::InvalidTemplate` for a malformed URL template
pub fn resolve(spec: &PackageSpec, index: &ReleaseIndex) -> Result<ResolvedRelease, Error> {
    spec.validate()?;
    let identifier = spec.identifier.as_str();

    let release = match (&spec.version, index) {
        (VersionSelector::Latest, ReleaseIndex::Unknown) => {
            return Err(ambiguous(identifier, "no release index is available"));
        }
        (VersionSelector::Latest, ReleaseIndex::Known(tags)) => pick_latest(identifier, tags)?,
        (VersionSelector::Exact { tag, version }, ReleaseIndex::Unknown) => ReleaseTag {
            tag: tag.clone(),
            version: version.clone(),
        },
        (VersionSelector::Exact { tag, version }, ReleaseIndex::Known(tags)) => {
            let mut matching = tags.iter().filter(|r| &r.version == version);
            let first = matching.next().ok_or_else(|| ResolveError::NotFound {
                identifier: identifier.to_string(),
                version: tag.clone(),
            })?;
            // Prefer the spelling the user asked for when both exist
            tags.iter()
                .find(|r| &r.tag == tag)
                .unwrap_or(first)
                .clone()
        }
    };

    let url = expand_url(&spec.url_template, identifier, &release)?;

    let checksum = match &spec.checksum {
        Some(pinned) if pinned.applies_to(&release.version) => Some(pinned.checksum.clone()),
        Some(pinned) => {
            tracing::debug!(
                identifier,
                resolved = %release.version,
                pinned_for = ?pinned.version,
                "pinned checksum is for another version; release is unpinned"
            );
            None
        }
        None => None,
    };

    Ok(ResolvedRelease {
        identifier: identifier.to_string(),
        version: release.version,
        tag: release.tag,
        url,
        checksum,
    })
}

/// Highest stable release; ties between distinct tags are ambiguous
fn pick_latest(identifier: &str, tags: &[ReleaseTag]) -> Result<ReleaseTag, Error> {
    if tags.is_empty() {
        return Err(ambiguous(identifier, "the release index is empty"));
    }

    let precedence = |r: &ReleaseTag| (r.version.major, r.version.minor, r.version.patch);
    let stable: Vec<&ReleaseTag> = tags.iter().filter(|r| r.version.pre.is_empty()).collect();

    let Some(best) = stable.iter().map(|r| precedence(r)).max() else {
        return Err(ambiguous(identifier, "only prereleases are published"));
    };

    let top: Vec<&&ReleaseTag> = stable.iter().filter(|r| precedence(r) == best).collect();
    match top.as_slice() {
        [only] => Ok((**only).clone()),
        many => {
            let names: Vec<&str> = many.iter().map(|r| r.tag.as_str()).collect();
            Err(ambiguous(
                identifier,
                &format!(
                    "tags {} all name version {}.{}.{}",
                    names.join(", "),
                    best.0,
                    best.1,
                    best.2
                ),
            ))
        }
    }
}

fn ambiguous(identifier: &str, reason: &str) -> Error {
    ResolveError::AmbiguousVersion {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
