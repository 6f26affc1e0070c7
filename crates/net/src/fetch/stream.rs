//! Low-level streaming mechanics: body to file, digest computed inline

use super::config::FetchConfig;
use futures::StreamExt;
use pinst_errors::{Error, NetworkError};
use pinst_hash::{Hash, Hasher};
use pinst_types::HashAlgorithm;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Stream an HTTP body into `dest_path`, hashing as it goes
pub(super) async fn stream_response(
    config: &FetchConfig,
    response: reqwest::Response,
    dest_path: &Path,
    algorithm: HashAlgorithm,
    url: &str,
) -> Result<(Hash, u64), Error> {
    let mut file = File::create(dest_path)
        .await
        .map_err(|e| Error::io_with_path(&e, dest_path))?;
    let mut hasher = Hasher::new(algorithm);
    let mut downloaded = 0u64;

    let mut stream = response.bytes_stream();
    loop {
        match tokio::time::timeout(config.chunk_timeout, stream.next()).await {
            Ok(Some(chunk)) => {
                let chunk = chunk.map_err(|e| NetworkError::Transfer {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

                downloaded += chunk.len() as u64;
                if downloaded > config.max_file_size {
                    return Err(NetworkError::FileSizeExceeded {
                        size: downloaded,
                        limit: config.max_file_size,
                    }
                    .into());
                }

                hasher.update(&chunk);
                file.write_all(&chunk).await?;
            }
            Ok(None) => break,
            Err(_) => {
                return Err(NetworkError::Timeout {
                    url: url.to_string(),
                }
                .into());
            }
        }
    }

    file.flush().await?;
    Ok((hasher.finalize(), downloaded))
}

/// Copy a local archive (`file://`) into `dest_path`, hashing as it goes
pub(super) async fn copy_local_file(
    config: &FetchConfig,
    source: &Path,
    dest_path: &Path,
    algorithm: HashAlgorithm,
    url: &str,
) -> Result<(Hash, u64), Error> {
    let unavailable = |e: std::io::Error| NetworkError::FileUnavailable {
        url: url.to_string(),
        message: e.to_string(),
    };

    let reader = File::open(source).await.map_err(unavailable)?;
    let size = reader.metadata().await.map_err(unavailable)?.len();
    if size > config.max_file_size {
        return Err(NetworkError::FileSizeExceeded {
            size,
            limit: config.max_file_size,
        }
        .into());
    }

    let writer = File::create(dest_path)
        .await
        .map_err(|e| Error::io_with_path(&e, dest_path))?;
    Hash::hash_and_copy(algorithm, reader, writer).await
}
