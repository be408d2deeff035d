//! Checksum algorithms for S3 object integrity verification.
//!
//! A [`Checksum`] is what gets committed to inside a presigned upload: its
//! base64 form travels in the `x-amz-checksum-{algorithm}` header, which is
//! part of the signature, and the backend recomputes it from the bytes it
//! receives. See [Checking object integrity] for the backend side.
//!
//! [Checking object integrity]: https://docs.aws.amazon.com/AmazonS3/latest/userguide/checking-object-integrity-upload.html

use base64::Engine;
use sha2::{Digest, Sha256};

/// A checksum algorithm that can compute checksums from data.
///
/// Use a `Hasher` variant to compute a [`Checksum`] from data:
///
/// ```
/// use s3_presign::Hasher;
/// let checksum = Hasher::Sha256.checksum(b"hello world");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Hasher {
    /// SHA-256 hashing algorithm.
    #[default]
    Sha256,
}

impl Hasher {
    /// Compute the checksum of the given data using this algorithm.
    pub fn checksum(&self, data: &[u8]) -> Checksum {
        match self {
            Self::Sha256 => Checksum::Sha256(Sha256::digest(data).into()),
        }
    }

    /// Algorithm identifier for the `x-amz-sdk-checksum-algorithm` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
        }
    }

    /// Name of the header that carries a checksum of this algorithm.
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::Sha256 => "x-amz-checksum-sha256",
        }
    }
}

/// A checksum algorithm and its computed value.
///
/// Computed once from the exact bytes that will be uploaded. The raw digest
/// is available through [`as_bytes`](Self::as_bytes) and the base64 encoding
/// S3 expects through [`Display`](std::fmt::Display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// SHA-256 checksum.
    Sha256([u8; 32]),
}

impl Checksum {
    /// Returns the algorithm that produced this checksum.
    pub fn algorithm(&self) -> Hasher {
        match self {
            Self::Sha256(_) => Hasher::Sha256,
        }
    }

    /// Returns the raw bytes of the checksum.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Sha256(checksum) => checksum,
        }
    }

    /// Returns the algorithm name used in S3 headers (e.g., "sha256").
    pub fn name(&self) -> &str {
        match self {
            Self::Sha256(_) => "sha256",
        }
    }

    /// Parse a base64 encoded digest produced by `algorithm`.
    pub fn from_base64(algorithm: Hasher, encoded: &str) -> Result<Self, String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| format!("invalid base64 checksum: {}", e))?;

        match algorithm {
            Hasher::Sha256 => {
                let digest: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                    format!("SHA-256 digest must be 32 bytes, got {}", bytes.len())
                })?;
                Ok(Self::Sha256(digest))
            }
        }
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from(self))
    }
}

impl From<&Checksum> for String {
    fn from(checksum: &Checksum) -> Self {
        base64::engine::general_purpose::STANDARD.encode(checksum.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_computes_sha256_checksum() {
        let checksum = Hasher::Sha256.checksum(b"hello world");
        assert_eq!(checksum.as_bytes().len(), 32);
        assert_eq!(checksum.algorithm(), Hasher::Sha256);
    }

    #[test]
    fn it_formats_checksum_as_base64() {
        let checksum = Hasher::Sha256.checksum(b"hello world");
        assert_eq!(
            checksum.to_string(),
            "uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek="
        );
    }

    #[test]
    fn it_is_stable_across_calls() {
        let first = Hasher::Sha256.checksum(b"hello");
        let second = Hasher::Sha256.checksum(b"hello");
        assert_eq!(first, second);
        assert_eq!(
            first.to_string(),
            "LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ="
        );
    }

    #[test]
    fn it_differs_for_one_changed_byte() {
        let hello = Hasher::Sha256.checksum(b"hello");
        let hellp = Hasher::Sha256.checksum(b"hellp");
        assert_ne!(hello, hellp);
        assert_ne!(hello.to_string(), hellp.to_string());
    }

    #[test]
    fn it_returns_checksum_algorithm_names() {
        let checksum = Hasher::Sha256.checksum(b"test");
        assert_eq!(checksum.name(), "sha256");
        assert_eq!(checksum.algorithm().as_str(), "SHA256");
        assert_eq!(
            checksum.algorithm().header_name(),
            format!("x-amz-checksum-{}", checksum.name())
        );
    }

    #[test]
    fn it_parses_base64_digest() {
        let checksum = Hasher::Sha256.checksum(b"hello world");
        let parsed = Checksum::from_base64(Hasher::Sha256, &checksum.to_string()).unwrap();
        assert_eq!(parsed, checksum);
    }

    #[test]
    fn it_rejects_wrong_length() {
        let result = Checksum::from_base64(Hasher::Sha256, "AAAA");
        assert!(result.unwrap_err().contains("must be 32 bytes"));

        let result = Checksum::from_base64(Hasher::Sha256, "not base64!");
        assert!(result.unwrap_err().contains("invalid base64"));
    }
}
