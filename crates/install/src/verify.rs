//! Integrity Verifier

use pinst_errors::{Error, IntegrityError};
use pinst_hash::Hash;
use pinst_net::FetchedArchive;
use pinst_types::{Checksum, Verification};

/// Compare the archive digest with the pinned checksum.
///
/// A mismatch is always an error and never retried. Without a checksum the
/// archive is `Unverified` and carries its observed digest so it can be
/// pinned later.
///
/// # Errors
///
/// Returns `IntegrityError::ChecksumMismatch` when the digests differ, or an
/// I/O error if the archive must be re-hashed with another algorithm and
/// cannot be read.
pub async fn verify(
    archive: &FetchedArchive,
    expected: Option<&Checksum>,
) -> Result<Verification, Error> {
    let Some(expected) = expected else {
        return Ok(Verification::Unverified(archive.digest.to_checksum()));
    };

    let actual = if archive.digest.algorithm() == expected.algorithm() {
        archive.digest.clone()
    } else {
        Hash::hash_file(expected.algorithm(), &archive.path).await?
    };

    if actual.matches(expected) {
        tracing::debug!(url = %archive.url, %expected, "checksum verified");
        Ok(Verification::Verified(expected.clone()))
    } else {
        Err(IntegrityError::ChecksumMismatch {
            algorithm: expected.algorithm().to_string(),
            expected: expected.hex().to_string(),
            actual: actual.to_hex(),
        }
        .into())
    }
}
