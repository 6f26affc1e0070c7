#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for pinst
//!
//! This crate is the Archive Fetcher: an HTTP client plus a retrying,
//! streaming downloader that buffers archives in scoped temporary
//! directories.

mod client;
mod fetch;

pub use client::{NetClient, NetConfig};
pub use fetch::{FetchConfig, FetchedArchive, Fetcher, RetryConfig};

use pinst_errors::{Error, NetworkError};
use url::Url;

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed.
pub fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")).into())
}
