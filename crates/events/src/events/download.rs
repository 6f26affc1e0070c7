use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FailureContext;

/// Archive transfer events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Response headers received, body about to stream
    Started {
        url: String,
        total_size: Option<u64>,
        attempt: u32,
    },

    /// Download retrying after a transient failure
    Retrying {
        url: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
        backoff_delay: Duration,
    },

    Completed {
        url: String,
        final_size: u64,
        total_time: Duration,
        hash: String,
    },

    /// Download failed for good (retries exhausted or not retryable)
    Failed {
        url: String,
        failure: FailureContext,
        attempts: u32,
    },
}
