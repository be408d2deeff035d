//! Upload destinations.

use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Longest object key S3 accepts, in bytes.
pub const MAX_KEY_LENGTH: usize = 1024;

const MIN_BUCKET_LENGTH: usize = 3;
const MAX_BUCKET_LENGTH: usize = 63;

/// The bucket and key an upload is destined for.
///
/// Construction is infallible; names are checked when the target is signed
/// so that a malformed target surfaces as [`AuthError::SigningFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadTarget {
    bucket: String,
    key: String,
}

impl UploadTarget {
    /// Create a target for `key` in `bucket`.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the object key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn validate(&self) -> Result<(), AuthError> {
        validate_bucket(&self.bucket)?;

        if self.key.is_empty() {
            return Err(AuthError::SigningFailed("object key is empty".into()));
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Err(AuthError::SigningFailed(format!(
                "object key is {} bytes, limit is {}",
                self.key.len(),
                MAX_KEY_LENGTH
            )));
        }
        // URLs resolve `.` and `..` segments, so such a key would be stored
        // somewhere else than named.
        if self.key.split('/').any(|segment| matches!(segment, "." | "..")) {
            return Err(AuthError::SigningFailed(format!(
                "object key {:?} contains a relative path segment",
                self.key
            )));
        }

        Ok(())
    }
}

/// S3 [bucket naming rules]: 3 to 63 lowercase letters, digits, `.` and `-`,
/// starting and ending with a letter or digit, without adjacent dots and not
/// shaped like an IPv4 address.
///
/// [bucket naming rules]: https://docs.aws.amazon.com/AmazonS3/latest/userguide/bucketnamingrules.html
fn validate_bucket(bucket: &str) -> Result<(), AuthError> {
    let malformed = |reason: &str| {
        Err(AuthError::SigningFailed(format!(
            "malformed bucket name {:?}: {}",
            bucket, reason
        )))
    };

    if !(MIN_BUCKET_LENGTH..=MAX_BUCKET_LENGTH).contains(&bucket.len()) {
        return malformed("must be 3 to 63 characters long");
    }
    if !bucket
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'-'))
    {
        return malformed("only lowercase letters, digits, '.' and '-' are allowed");
    }
    let edges = [bucket.as_bytes()[0], bucket.as_bytes()[bucket.len() - 1]];
    if !edges.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()) {
        return malformed("must start and end with a letter or digit");
    }
    if bucket.contains("..") {
        return malformed("adjacent periods are not allowed");
    }
    if bucket.parse::<std::net::Ipv4Addr>().is_ok() {
        return malformed("must not be formatted as an IP address");
    }

    Ok(())
}

impl std::fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_accepts_valid_bucket_names() {
        let longest = "a".repeat(63);
        for bucket in ["abc", "my.bucket-1", "bucket", longest.as_str()] {
            assert!(
                UploadTarget::new(bucket, "a/b/c.txt").validate().is_ok(),
                "bucket {:?} should be accepted",
                bucket
            );
        }
    }

    #[test]
    fn it_rejects_malformed_buckets() {
        let too_long = "a".repeat(64);
        for bucket in [
            "",
            "b",
            "ab",
            too_long.as_str(),
            "has/slash",
            "has space",
            "ünicode",
            "Upper",
            "under_score",
            "-leading",
            "trailing.",
            "two..dots",
            "192.168.1.1",
        ] {
            let result = UploadTarget::new(bucket, "key").validate();
            assert!(
                matches!(result, Err(AuthError::SigningFailed(_))),
                "bucket {:?} should be rejected",
                bucket
            );
        }
    }

    #[test]
    fn it_rejects_empty_and_oversized_keys() {
        assert!(UploadTarget::new("bucket", "").validate().is_err());
        assert!(
            UploadTarget::new("bucket", "k".repeat(MAX_KEY_LENGTH))
                .validate()
                .is_ok()
        );
        assert!(
            UploadTarget::new("bucket", "k".repeat(MAX_KEY_LENGTH + 1))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn it_rejects_relative_key_segments() {
        for key in ["a/../evil", "./k", "a/./b", ".", "..", "a/.."] {
            assert!(
                matches!(
                    UploadTarget::new("bucket", key).validate(),
                    Err(AuthError::SigningFailed(_))
                ),
                "key {:?} should be rejected",
                key
            );
        }
        for key in ["/k", ".hidden", "a/..b/c", "a.b", "dir/"] {
            assert!(
                UploadTarget::new("bucket", key).validate().is_ok(),
                "key {:?} should be accepted",
                key
            );
        }
    }

    #[test]
    fn it_displays_as_s3_uri() {
        assert_eq!(UploadTarget::new("bucket", "k").to_string(), "s3://bucket/k");
    }
}
