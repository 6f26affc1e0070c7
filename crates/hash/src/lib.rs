#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Archive digests for pinst
//!
//! SHA-256 is the default (it is what release checksums are published in);
//! BLAKE3 is available for formulas that pin `blake3:` digests.

use pinst_errors::{Error, IntegrityError};
use pinst_types::{Checksum, HashAlgorithm};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// A computed digest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    algorithm: HashAlgorithm,
    bytes: [u8; 32],
}

impl Hash {
    /// Create a hash from raw bytes
    #[must_use]
    pub fn from_bytes(algorithm: HashAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from hex string
    ///
    /// # Errors
    /// Returns an error if the input is not valid hexadecimal or is not exactly 64 characters (32 bytes).
    pub fn from_hex(algorithm: HashAlgorithm, s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|e| IntegrityError::InvalidChecksum {
            input: s.to_string(),
            message: format!("invalid hex: {e}"),
        })?;

        let array: [u8; 32] =
            bytes
                .try_into()
                .map_err(|bytes: Vec<u8>| IntegrityError::InvalidChecksum {
                    input: s.to_string(),
                    message: format!("hash must be 32 bytes, got {}", bytes.len()),
                })?;

        Ok(Self::from_bytes(algorithm, array))
    }

    /// Compute hash of a byte slice
    #[must_use]
    pub fn from_data(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        let mut hasher = Hasher::new(algorithm);
        hasher.update(data);
        hasher.finalize()
    }

    /// Compute hash of a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, read, or if any I/O operation fails.
    pub async fn hash_file(algorithm: HashAlgorithm, path: &Path) -> Result<Self, Error> {
        let mut file = File::open(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;

        let mut hasher = Hasher::new(algorithm);
        let mut buffer = vec![0; CHUNK_SIZE];

        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hasher.finalize())
    }

    /// Compute hash while copying data to a writer
    ///
    /// # Errors
    /// Returns an error if reading from the reader or writing to the writer fails.
    pub async fn hash_and_copy<R, W>(
        algorithm: HashAlgorithm,
        mut reader: R,
        mut writer: W,
    ) -> Result<(Self, u64), Error>
    where
        R: AsyncReadExt + Unpin,
        W: AsyncWriteExt + Unpin,
    {
        let mut hasher = Hasher::new(algorithm);
        let mut buffer = vec![0; CHUNK_SIZE];
        let mut total_bytes = 0u64;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }

            hasher.update(&buffer[..n]);
            writer.write_all(&buffer[..n]).await?;
            total_bytes += n as u64;
        }

        writer.flush().await?;
        Ok((hasher.finalize(), total_bytes))
    }

    /// This digest as a `Checksum` (for reports and comparisons)
    #[must_use]
    pub fn to_checksum(&self) -> Checksum {
        Checksum::from_digest(self.algorithm, &self.to_hex())
    }

    /// Compare against an expected checksum.
    ///
    /// Algorithms must agree; the hex comparison is case-insensitive because
    /// `Checksum` is normalized to lower case.
    #[must_use]
    pub fn matches(&self, expected: &Checksum) -> bool {
        self.algorithm == expected.algorithm() && self.to_hex() == expected.hex()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| serde::de::Error::custom("expected <algorithm>:<hex>"))?;
        let algorithm = algorithm.parse().map_err(serde::de::Error::custom)?;
        Self::from_hex(algorithm, hex).map_err(serde::de::Error::custom)
    }
}

/// Incremental hasher over either supported algorithm
pub enum Hasher {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(hasher) => hasher.update(data),
            Self::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    #[must_use]
    pub fn finalize(self) -> Hash {
        match self {
            Self::Sha256(hasher) => Hash::from_bytes(HashAlgorithm::Sha256, hasher.finalize().into()),
            Self::Blake3(hasher) => {
                Hash::from_bytes(HashAlgorithm::Blake3, *hasher.finalize().as_bytes())
            }
        }
    }
}

/// Verify a file matches an expected checksum
///
/// # Errors
/// Returns an error if the file cannot be read or hashed.
pub async fn verify_file(path: &Path, expected: &Checksum) -> Result<bool, Error> {
    let actual = Hash::hash_file(expected.algorithm(), path).await?;
    Ok(actual.matches(expected))
}
