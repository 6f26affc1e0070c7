//! Release indexes: what versions of a package are published

use pinst_errors::{Error, ResolveError};
use pinst_events::{AppEvent, EventEmitter, ResolveEvent};
use pinst_net::Fetcher;
use pinst_types::{Formula, ReleaseTag};
use serde::Deserialize;

/// The set of published releases, when one is available
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseIndex {
    /// No catalogue: exact tags are trusted, `latest` cannot be answered
    Unknown,
    Known(Vec<ReleaseTag>),
}

impl ReleaseIndex {
    /// Build an index from published tag names.
    ///
    /// Tags that are not versions (`nightly`, `release-2020`) are skipped;
    /// repeated tag strings are kept once.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut releases: Vec<ReleaseTag> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref();
            match ReleaseTag::parse(tag) {
                Ok(release) => {
                    if !releases.iter().any(|r| r.tag == release.tag) {
                        releases.push(release);
                    }
                }
                Err(_) => tracing::debug!(tag, "skipping unrecognized release tag"),
            }
        }
        Self::Known(releases)
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Number of usable releases (zero when unknown)
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::Known(tags) => tags.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a package's release list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSource {
    None,
    /// Tags listed inline in the formula
    Static(Vec<String>),
    /// A URL returning a JSON array of `{ "name": "<tag>" }` (GitHub tags
    /// API) or `{ "tag_name": "<tag>" }` (GitHub releases API) objects
    Remote(String),
}

impl IndexSource {
    /// A remote index wins over an inline list
    #[must_use]
    pub fn from_formula(formula: &Formula) -> Self {
        if let Some(url) = &formula.releases_url {
            Self::Remote(url.clone())
        } else if formula.releases.is_empty() {
            Self::None
        } else {
            Self::Static(formula.releases.clone())
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::Static(_) => "formula".to_string(),
            Self::Remote(url) => url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteRelease {
    name: Option<String>,
    tag_name: Option<String>,
    #[serde(default)]
    draft: bool,
}

impl RemoteRelease {
    fn into_tag(self) -> Option<String> {
        if self.draft {
            return None;
        }
        self.tag_name.or(self.name)
    }
}

/// Parse a remote index document
///
/// # Errors
///
/// Returns `ResolveError::InvalidFormula` when the document is not a JSON
/// array of release objects.
pub(crate) fn parse_remote_index(url: &str, body: &str) -> Result<ReleaseIndex, ResolveError> {
    let entries: Vec<RemoteRelease> =
        serde_json::from_str(body).map_err(|e| ResolveError::InvalidFormula {
            path: url.to_string(),
            message: format!("release index is not a JSON list of releases: {e}"),
        })?;

    Ok(ReleaseIndex::from_tags(
        entries.into_iter().filter_map(RemoteRelease::into_tag),
    ))
}

/// Materialize a release index
///
/// # Errors
///
/// Network failures while fetching a remote index, or an unparsable index
/// document.
pub async fn fetch_index<E: EventEmitter>(
    fetcher: &Fetcher,
    identifier: &str,
    source: &IndexSource,
    events: &E,
) -> Result<ReleaseIndex, Error> {
    let index = match source {
        IndexSource::None => return Ok(ReleaseIndex::Unknown),
        IndexSource::Static(tags) => ReleaseIndex::from_tags(tags),
        IndexSource::Remote(url) => {
            let body = fetcher.fetch_text(url, events).await?;
            parse_remote_index(url, &body)?
        }
    };

    events.emit(AppEvent::Resolve(ResolveEvent::IndexLoaded {
        identifier: identifier.to_string(),
        source: source.describe(),
        tags: index.len(),
    }));

    Ok(index)
}
