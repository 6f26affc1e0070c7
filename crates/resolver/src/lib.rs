#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Release Locator for pinst
//!
//! Turns a `PackageSpec` into a concrete `ResolvedRelease`. Resolution
//! itself ([`resolve`]) is pure and safe to retry; obtaining the list of
//! published releases ([`fetch_index`]) is the only I/O in this crate.

mod index;
mod locate;
mod template;

pub use index::{fetch_index, IndexSource, ReleaseIndex};
pub use locate::resolve;
pub use template::expand_url;
