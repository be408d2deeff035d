//! Inputs and outputs of request authorization.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use http::{HeaderMap, Method};
use url::Url;

use crate::{Checksum, UploadTarget};

/// Default content type of an upload.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Default lifetime of an authorization: 1 hour.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(3600);

/// Longest lifetime SigV4 allows for a presigned request: 7 days.
pub const MAX_EXPIRY: Duration = Duration::from_secs(7 * 24 * 3600);

/// S3 canned ACL applied to an uploaded object.
///
/// See: https://docs.aws.amazon.com/AmazonS3/latest/userguide/acl-overview.html#canned-acl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    /// Owner gets FULL_CONTROL. No one else has access rights.
    Private,
    /// Owner gets FULL_CONTROL. The AllUsers group gets READ access.
    PublicRead,
    /// Owner gets FULL_CONTROL. The AuthenticatedUsers group gets READ access.
    AuthenticatedRead,
    /// Object owner gets FULL_CONTROL. Bucket owner gets READ access.
    BucketOwnerRead,
    /// Both the object owner and the bucket owner get FULL_CONTROL.
    BucketOwnerFullControl,
}

impl Acl {
    /// Get the S3 ACL header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::AuthenticatedRead => "authenticated-read",
            Self::BucketOwnerRead => "bucket-owner-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// Everything that gets bound into the signature of an upload.
///
/// Built from the target, the payload checksum and the payload length; the
/// remaining fields default to a generic binary content type and a one hour
/// expiry.
///
/// ```
/// use s3_presign::{AuthorizationRequest, Hasher, UploadTarget};
/// use std::time::Duration;
///
/// let request = AuthorizationRequest::new(
///     UploadTarget::new("my-bucket", "greeting.txt"),
///     Hasher::Sha256.checksum(b"hello"),
///     5,
/// )
/// .with_content_type("text/plain")
/// .with_expiry(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    target: UploadTarget,
    checksum: Checksum,
    content_length: u64,
    content_type: String,
    expiry: Duration,
    acl: Option<Acl>,
    storage_class: Option<String>,
    metadata: BTreeMap<String, String>,
}

impl AuthorizationRequest {
    /// Create a request for uploading `content_length` bytes whose digest is
    /// `checksum` to `target`.
    ///
    /// `content_length` must equal the length of the payload that will be
    /// sent; the backend rejects the transfer otherwise.
    pub fn new(target: UploadTarget, checksum: Checksum, content_length: u64) -> Self {
        Self {
            target,
            checksum,
            content_length,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            expiry: DEFAULT_EXPIRY,
            acl: None,
            storage_class: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the content type. A blank value keeps the default.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        let content_type = content_type.trim();
        if !content_type.is_empty() {
            self.content_type = content_type.to_string();
        }
        self
    }

    /// Set how long the authorization stays valid. Zero means the default.
    ///
    /// Signatures count whole seconds, so anything under one second is zero.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Set the canned ACL of the uploaded object.
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = Some(acl);
        self
    }

    /// Set the storage class of the uploaded object (e.g. `STANDARD_IA`).
    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = Some(storage_class.into());
        self
    }

    /// Attach a user metadata entry, sent as `x-amz-meta-{name}`.
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// The destination of the upload.
    pub fn target(&self) -> &UploadTarget {
        &self.target
    }

    /// The checksum of the payload.
    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    /// The declared payload length.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// The content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The requested expiry, with zero replaced by [`DEFAULT_EXPIRY`].
    pub fn expiry(&self) -> Duration {
        if self.expiry.as_secs() == 0 {
            DEFAULT_EXPIRY
        } else {
            self.expiry
        }
    }

    /// The canned ACL, if any.
    pub fn acl(&self) -> Option<Acl> {
        self.acl
    }

    /// The storage class, if any.
    pub fn storage_class(&self) -> Option<&str> {
        self.storage_class.as_deref()
    }

    /// User metadata, keyed by lowercase name.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

/// A signed, time-limited permission to perform exactly one upload.
///
/// Anyone holding it can send `method` to `url` with `headers` attached until
/// `valid_until`. The signature covers the method, path, content length,
/// content type and checksum, so none of them can be changed in transit.
#[derive(Debug, Clone)]
pub struct SignedAuthorization {
    /// HTTP method to use
    pub method: Method,
    /// Presigned URL, including the signature query parameters
    pub url: Url,
    /// Headers that must be sent verbatim with the request
    pub headers: HeaderMap,
    /// Instant after which the backend refuses the request
    pub valid_until: DateTime<Utc>,
}

impl SignedAuthorization {
    /// Value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Value of a query parameter of the presigned URL.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Whether the authorization has lapsed at `time`.
    pub fn is_expired_at(&self, time: DateTime<Utc>) -> bool {
        time > self.valid_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hasher;

    fn request() -> AuthorizationRequest {
        AuthorizationRequest::new(
            UploadTarget::new("bucket", "k"),
            Hasher::Sha256.checksum(b"hello"),
            5,
        )
    }

    #[test]
    fn it_applies_defaults() {
        let request = request();
        assert_eq!(request.content_type(), DEFAULT_CONTENT_TYPE);
        assert_eq!(request.expiry(), DEFAULT_EXPIRY);
        assert_eq!(request.acl(), None);
        assert!(request.metadata().is_empty());
    }

    #[test]
    fn it_treats_zero_expiry_as_default() {
        let request = request().with_expiry(Duration::ZERO);
        assert_eq!(request.expiry(), Duration::from_secs(3600));

        let request = request.with_expiry(Duration::from_millis(500));
        assert_eq!(request.expiry(), DEFAULT_EXPIRY);
    }

    #[test]
    fn it_keeps_default_content_type_for_blank_value() {
        let request = request().with_content_type("");
        assert_eq!(request.content_type(), "application/octet-stream");

        let request = request.with_content_type("   ");
        assert_eq!(request.content_type(), "application/octet-stream");

        let request = request.with_content_type("text/plain");
        assert_eq!(request.content_type(), "text/plain");
    }

    #[test]
    fn it_lowercases_metadata_names() {
        let request = request().with_metadata("Origin-Host", "builder-7");
        assert_eq!(
            request.metadata().get("origin-host").map(String::as_str),
            Some("builder-7")
        );
    }
}
