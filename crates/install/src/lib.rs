#![warn(clippy::pedantic)]
#![deny(clippy::all)]

//! Integrity verification and installation for pinst
//!
//! Takes a fetched archive through verify, lock, extract, atomic placement
//! and smoke test. The destination path only ever holds the previous
//! artifact or the complete new one: the executable is written to a
//! temporary file in the destination directory and renamed into place.

mod archive;
mod installer;
mod lock;
mod phase;
mod placement;
mod preflight;
mod smoke;
mod verify;

pub use archive::{ArchiveEntry, ArchiveFormat, CopyLimits};
pub use installer::{install_archive, or_cancelled, InstallOptions};
pub use lock::DestinationLock;
pub use phase::PhaseTracker;
pub use placement::{persist, stage_entry, StageRequest};
pub use preflight::check_destination;
pub use smoke::run_smoke_test;
pub use verify::verify;
