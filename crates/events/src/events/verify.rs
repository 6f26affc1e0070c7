use serde::{Deserialize, Serialize};

/// Integrity Verifier events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VerifyEvent {
    Verified {
        url: String,
        checksum: String,
    },

    /// No checksum was pinned; `digest` is what the archive hashed to
    Unverified {
        url: String,
        digest: String,
    },

    Mismatch {
        url: String,
        expected: String,
        actual: String,
    },
}
