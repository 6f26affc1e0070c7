use pinst_types::Version;
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Release Locator events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolveEvent {
    Started {
        identifier: String,
        selector: String,
    },

    /// A release index was materialized (static list or remote document)
    IndexLoaded {
        identifier: String,
        source: String,
        tags: usize,
    },

    Completed {
        identifier: String,
        version: Version,
        tag: String,
        url: String,
        pinned: bool,
    },

    Failed {
        identifier: String,
        failure: FailureContext,
    },
}
