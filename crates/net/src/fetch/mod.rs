//! Archive Fetcher
//!
//! Streams a release archive into a scoped temporary directory with retry,
//! backoff and per-attempt timeouts, computing its digest on the way.

mod config;
mod retry;
mod stream;
mod validation;

pub use config::{FetchConfig, RetryConfig};

use crate::client::NetClient;
use pinst_errors::{Error, NetworkError};
use pinst_events::{AppEvent, DownloadEvent, EventEmitter};
use pinst_hash::Hash;
use pinst_types::HashAlgorithm;
use retry::with_retry;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use url::Url;
use validation::{file_name_from_url, validate_response, validate_url};

/// A downloaded archive living in its own temporary directory.
///
/// Dropping it removes the directory, whichever way the install ends.
#[derive(Debug)]
pub struct FetchedArchive {
    workdir: TempDir,
    pub path: PathBuf,
    pub url: String,
    pub file_name: String,
    pub size: u64,
    pub digest: Hash,
}

impl FetchedArchive {
    /// Scoped directory holding the archive
    #[must_use]
    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }
}

/// Downloads archives and small documents with the configured retry policy
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: NetClient,
    config: FetchConfig,
}

impl Fetcher {
    #[must_use]
    pub fn new(client: NetClient, config: FetchConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch `url` into a fresh temporary directory
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::HttpStatus` for non-2xx responses (4xx are not
    /// retried), and the last transport error once retries are exhausted.
    pub async fn fetch<E: EventEmitter>(
        &self,
        url: &str,
        algorithm: HashAlgorithm,
        events: &E,
    ) -> Result<FetchedArchive, Error> {
        let parsed = validate_url(url)?;
        let file_name = file_name_from_url(&parsed);
        let workdir = tempfile::Builder::new().prefix("pinst-fetch-").tempdir()?;
        let dest = workdir.path().join(&file_name);
        let start = Instant::now();

        let (digest, size) = with_retry(&self.config, url, events, |attempt| {
            self.try_fetch(&parsed, &dest, algorithm, attempt, events)
        })
        .await?;

        events.emit(AppEvent::Download(DownloadEvent::Completed {
            url: url.to_string(),
            final_size: size,
            total_time: start.elapsed(),
            hash: digest.to_string(),
        }));

        Ok(FetchedArchive {
            workdir,
            path: dest,
            url: url.to_string(),
            file_name,
            size,
            digest,
        })
    }

    async fn try_fetch<E: EventEmitter>(
        &self,
        url: &Url,
        dest: &Path,
        algorithm: HashAlgorithm,
        attempt: u32,
        events: &E,
    ) -> Result<(Hash, u64), Error> {
        if url.scheme() == "file" {
            let source = local_path(url)?;
            events.emit(AppEvent::Download(DownloadEvent::Started {
                url: url.to_string(),
                total_size: None,
                attempt,
            }));
            return stream::copy_local_file(&self.config, &source, dest, algorithm, url.as_str())
                .await;
        }

        let response = self.client.get(url.as_str()).await?;
        validate_response(&response, url.as_str())?;

        let total_size = response.content_length();
        if let Some(size) = total_size {
            if size > self.config.max_file_size {
                return Err(NetworkError::FileSizeExceeded {
                    size,
                    limit: self.config.max_file_size,
                }
                .into());
            }
        }

        events.emit(AppEvent::Download(DownloadEvent::Started {
            url: url.to_string(),
            total_size,
            attempt,
        }));

        stream::stream_response(&self.config, response, dest, algorithm, url.as_str()).await
    }

    /// Fetch a small text document (a release index) with the same policy
    ///
    /// # Errors
    ///
    /// Same classification as [`Fetcher::fetch`]; bodies over the size limit
    /// are rejected.
    pub async fn fetch_text<E: EventEmitter>(&self, url: &str, events: &E) -> Result<String, Error> {
        let parsed = validate_url(url)?;
        events.emit_debug(format!("Fetching text from {url}"));

        with_retry(&self.config, url, events, |_| self.try_fetch_text(&parsed)).await
    }

    async fn try_fetch_text(&self, url: &Url) -> Result<String, Error> {
        if url.scheme() == "file" {
            let source = local_path(url)?;
            let mut text = String::new();
            tokio::fs::File::open(&source)
                .await
                .map_err(|e| NetworkError::FileUnavailable {
                    url: url.to_string(),
                    message: e.to_string(),
                })?
                .take(self.config.max_file_size)
                .read_to_string(&mut text)
                .await?;
            return Ok(text);
        }

        let response = self.client.get(url.as_str()).await?;
        validate_response(&response, url.as_str())?;
        if response
            .content_length()
            .is_some_and(|size| size > self.config.max_file_size)
        {
            return Err(NetworkError::FileSizeExceeded {
                size: response.content_length().unwrap_or_default(),
                limit: self.config.max_file_size,
            }
            .into());
        }

        response.text().await.map_err(|e| {
            NetworkError::Transfer {
                url: url.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

fn local_path(url: &Url) -> Result<PathBuf, Error> {
    url.to_file_path()
        .map_err(|()| NetworkError::InvalidUrl(format!("{url}: not a local path")).into())
}
