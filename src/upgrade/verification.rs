use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::core::TransferError;

/// Verifies the integrity of a downloaded package using its SHA-256 checksum.
///
/// Releases may publish a `file_hash` next to the download URL. When they
/// do, the bytes received by the transfer engine are checked against it
/// before anything reaches the package store, so a corrupted or truncated
/// package is never handed to the installer.
///
/// Checksums are accepted as bare hex or with a `sha256:` prefix and are
/// compared case-insensitively.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the hex-encoded SHA-256 checksum of `bytes`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use float_update::upgrade::verification::ChecksumVerifier;
    ///
    /// assert_eq!(
    ///     ChecksumVerifier::compute_sha256(b"Hello, World!"),
    ///     "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
    /// );
    /// ```
    #[must_use]
    pub fn compute_sha256(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Verify `bytes` against an expected checksum.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::ChecksumMismatch`] when the digests differ.
    pub fn verify(bytes: &[u8], expected_checksum: &str) -> Result<(), TransferError> {
        let expected = normalize(expected_checksum);
        debug!("Verifying {} bytes against sha256 {}", bytes.len(), expected);

        let actual = Self::compute_sha256(bytes);
        if actual != expected {
            return Err(TransferError::ChecksumMismatch {
                expected,
                actual,
            });
        }

        info!("Checksum verification successful");
        Ok(())
    }
}

fn normalize(checksum: &str) -> String {
    let trimmed = checksum.trim();
    let hex = trimmed
        .strip_prefix("sha256:")
        .or_else(|| trimmed.strip_prefix("SHA256:"))
        .unwrap_or(trimmed);
    hex.to_ascii_lowercase()
}
