//! Install targets, phases and results

use crate::{Checksum, Version};
use pinst_errors::{Error, InstallError, IntegrityError, NetworkError, ResolveError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default permission bits for installed executables
pub const DEFAULT_MODE: u32 = 0o755;

/// Permission bits an install may set; setuid, setgid and sticky are never applied
pub const MODE_MASK: u32 = 0o777;

/// Default upper bound for an extracted executable
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 1024 * 1024 * 1024; // 1GB

/// Final location of the installed executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallTarget {
    pub directory: PathBuf,
    pub file_name: String,
    pub mode: u32,
}

impl InstallTarget {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            mode: DEFAULT_MODE,
        }
    }

    /// Set the permission bits, dropping anything outside [`MODE_MASK`]
    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode & MODE_MASK;
        self
    }

    /// Full path of the installed file
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Classification of a failed install, one per distinct exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Usage,
    NotFound,
    AmbiguousVersion,
    Network,
    HttpStatus,
    ChecksumMismatch,
    MalformedArchive,
    Permission,
    PostInstallVerification,
    Install,
    Cancelled,
    Internal,
}

impl From<&Error> for FailureKind {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_) => Self::Usage,
            Error::Resolve(ResolveError::NotFound { .. } | ResolveError::FormulaNotFound { .. }) => {
                Self::NotFound
            }
            Error::Resolve(ResolveError::AmbiguousVersion { .. }) => Self::AmbiguousVersion,
            Error::Resolve(_) | Error::Integrity(IntegrityError::InvalidChecksum { .. }) => {
                Self::Usage
            }
            Error::Integrity(_) => Self::ChecksumMismatch,
            Error::Network(NetworkError::HttpStatus { .. }) => Self::HttpStatus,
            Error::Network(_) => Self::Network,
            Error::Install(InstallError::MalformedArchive { .. }) => Self::MalformedArchive,
            Error::Install(InstallError::PermissionDenied { .. }) => Self::Permission,
            Error::Install(InstallError::PostInstallVerification { .. }) => {
                Self::PostInstallVerification
            }
            Error::Install(_) => Self::Install,
            Error::Cancelled => Self::Cancelled,
            Error::Io { kind, .. } if *kind == std::io::ErrorKind::PermissionDenied => {
                Self::Permission
            }
            Error::Io { .. } | Error::Internal(_) => Self::Internal,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Usage => "usage",
            Self::NotFound => "not_found",
            Self::AmbiguousVersion => "ambiguous_version",
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::ChecksumMismatch => "checksum_mismatch",
            Self::MalformedArchive => "malformed_archive",
            Self::Permission => "permission",
            Self::PostInstallVerification => "post_install_verification",
            Self::Install => "install",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Lifecycle of one install.
///
/// `Pending -> Fetched -> Verified -> Placed -> Tested -> Done`, with
/// `Failed` reachable from every non-terminal phase. No phase is re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "kind")]
pub enum InstallPhase {
    Pending,
    Fetched,
    Verified,
    Placed,
    Tested,
    Done,
    Failed(FailureKind),
}

impl InstallPhase {
    /// The only forward successor of this phase
    #[must_use]
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Fetched),
            Self::Fetched => Some(Self::Verified),
            Self::Verified => Some(Self::Placed),
            Self::Placed => Some(Self::Tested),
            Self::Tested => Some(Self::Done),
            Self::Done | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Whether moving from `self` to `next` is a legal transition
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        match next {
            Self::Failed(_) => !self.is_terminal(),
            _ => self.successor() == Some(next),
        }
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Fetched => f.write_str("fetched"),
            Self::Verified => f.write_str("verified"),
            Self::Placed => f.write_str("placed"),
            Self::Tested => f.write_str("tested"),
            Self::Done => f.write_str("done"),
            Self::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

/// Outcome of the integrity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "checksum")]
pub enum Verification {
    /// The archive matched the pinned checksum
    Verified(Checksum),
    /// No checksum was pinned; carries the observed digest
    Unverified(Checksum),
}

impl Verification {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// Digest of the archive as observed
    #[must_use]
    pub fn checksum(&self) -> &Checksum {
        match self {
            Self::Verified(checksum) | Self::Unverified(checksum) => checksum,
        }
    }
}

/// Post-install check: run the artifact and look for expected output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeTest {
    #[serde(default = "default_smoke_args")]
    pub args: Vec<String>,
    /// Substring expected in combined stdout and stderr
    #[serde(default)]
    pub expect: Option<String>,
    /// Expected exit status; any status is accepted when absent
    #[serde(default)]
    pub expect_status: Option<i32>,
    #[serde(default = "default_smoke_timeout")]
    pub timeout_secs: u64,
}

impl Default for SmokeTest {
    fn default() -> Self {
        Self {
            args: default_smoke_args(),
            expect: None,
            expect_status: None,
            timeout_secs: default_smoke_timeout(),
        }
    }
}

fn default_smoke_args() -> Vec<String> {
    vec!["--help".to_string()]
}

fn default_smoke_timeout() -> u64 {
    10
}

/// Result of the post-install smoke test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SmokeTestOutcome {
    Passed,
    Failed { reason: String },
    Skipped,
}

/// Terminal value of a successful install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallResult {
    pub package: String,
    pub version: Version,
    pub path: PathBuf,
    pub verification: Verification,
    pub smoke_test: SmokeTestOutcome,
    pub phase: InstallPhase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_only() {
        use InstallPhase::*;
        assert!(Pending.can_advance_to(Fetched));
        assert!(Fetched.can_advance_to(Verified));
        assert!(Tested.can_advance_to(Done));
        assert!(!Pending.can_advance_to(Verified));
        assert!(!Verified.can_advance_to(Fetched));
        assert!(!Placed.can_advance_to(Placed));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal() {
        use InstallPhase::*;
        let failed = Failed(FailureKind::Network);
        assert!(Pending.can_advance_to(failed));
        assert!(Placed.can_advance_to(failed));
        assert!(!Done.can_advance_to(failed));
        assert!(!failed.can_advance_to(Failed(FailureKind::Internal)));
    }

    #[test]
    fn test_failure_kind_mapping() {
        let err: Error = NetworkError::HttpStatus {
            url: "u".into(),
            status: 404,
            message: "Not Found".into(),
        }
        .into();
        assert_eq!(FailureKind::from(&err), FailureKind::HttpStatus);

        let err: Error = IntegrityError::ChecksumMismatch {
            algorithm: "sha256".into(),
            expected: "a".into(),
            actual: "b".into(),
        }
        .into();
        assert_eq!(FailureKind::from(&err), FailureKind::ChecksumMismatch);
    }

    #[test]
    fn test_target_path() {
        let target = InstallTarget::new("/tmp/bin", "demo");
        assert_eq!(target.path(), PathBuf::from("/tmp/bin/demo"));
        assert_eq!(target.mode, DEFAULT_MODE);
    }

    #[test]
    fn test_target_mode_drops_special_bits() {
        let target = InstallTarget::new("/tmp/bin", "demo").with_mode(0o4755);
        assert_eq!(target.mode, 0o755);
        let target = InstallTarget::new("/tmp/bin", "demo").with_mode(0o170_700);
        assert_eq!(target.mode, 0o700);
    }
}
