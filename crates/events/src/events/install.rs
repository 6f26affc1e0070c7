use pinst_types::{InstallPhase, SmokeTestOutcome, Version};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::FailureContext;

/// Installer events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstallEvent {
    PhaseChanged {
        package: String,
        from: InstallPhase,
        to: InstallPhase,
    },

    /// The executable was renamed onto its final path
    Placed {
        package: String,
        path: PathBuf,
        replaced: bool,
    },

    SmokeTestStarted {
        path: PathBuf,
        args: Vec<String>,
    },

    SmokeTestCompleted {
        path: PathBuf,
        outcome: SmokeTestOutcome,
    },

    Completed {
        package: String,
        version: Version,
        path: PathBuf,
        duration: Duration,
    },

    Failed {
        package: String,
        failure: FailureContext,
    },
}
