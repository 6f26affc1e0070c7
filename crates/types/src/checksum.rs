//! Expected digests as written by users and formulas

use pinst_errors::IntegrityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digest algorithm used to verify archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// Canonical lower-case name, also used as checksum prefix
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(IntegrityError::InvalidChecksum {
                input: s.to_string(),
                message: format!("unknown algorithm '{other}'"),
            }),
        }
    }
}

/// An expected (or observed) digest in lower-case hex.
///
/// The hex string is not required to have the algorithm's digest length:
/// a short or long value simply never matches and fails verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    algorithm: HashAlgorithm,
    hex: String,
}

impl Checksum {
    /// Create a checksum from an algorithm and a hex string
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError::InvalidChecksum` if `hex` is empty, has odd
    /// length or contains non-hex characters.
    pub fn new(algorithm: HashAlgorithm, hex: &str) -> Result<Self, IntegrityError> {
        let hex = hex.trim();
        if hex.is_empty() {
            return Err(IntegrityError::InvalidChecksum {
                input: hex.to_string(),
                message: "empty digest".to_string(),
            });
        }
        if hex.len() % 2 != 0 {
            return Err(IntegrityError::InvalidChecksum {
                input: hex.to_string(),
                message: "odd number of hex digits".to_string(),
            });
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(IntegrityError::InvalidChecksum {
                input: hex.to_string(),
                message: format!("'{bad}' is not a hex digit"),
            });
        }
        Ok(Self {
            algorithm,
            hex: hex.to_ascii_lowercase(),
        })
    }

    /// Parse `hex`, `sha256:hex` or `blake3:hex`
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError::InvalidChecksum` for unknown prefixes or
    /// malformed hex.
    pub fn parse(input: &str) -> Result<Self, IntegrityError> {
        match input.trim().split_once(':') {
            Some((algorithm, hex)) => Self::new(algorithm.parse()?, hex),
            None => Self::new(HashAlgorithm::Sha256, input),
        }
    }

    /// Wrap a digest produced locally by a hasher.
    ///
    /// The caller guarantees `hex` is already hex-encoded.
    #[must_use]
    pub fn from_digest(algorithm: HashAlgorithm, hex: &str) -> Self {
        Self {
            algorithm,
            hex: hex.to_ascii_lowercase(),
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Checksum {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Checksum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_hex_defaults_to_sha256() {
        let checksum = Checksum::parse("DEADBEEF").unwrap();
        assert_eq!(checksum.algorithm(), HashAlgorithm::Sha256);
        assert_eq!(checksum.hex(), "deadbeef");
    }

    #[test]
    fn test_parse_prefixed() {
        let checksum = Checksum::parse("blake3:00ff").unwrap();
        assert_eq!(checksum.algorithm(), HashAlgorithm::Blake3);
        assert_eq!(checksum.to_string(), "blake3:00ff");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Checksum::parse("").is_err());
        assert!(Checksum::parse("abc").is_err());
        assert!(Checksum::parse("zz").is_err());
        assert!(Checksum::parse("md5:00ff").is_err());
    }
}
