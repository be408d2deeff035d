//! S3 service address and object URL construction.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::AuthError;

/// Address of an S3-compatible service.
///
/// Combines endpoint and signing region into a plain data struct that works
/// with any S3-compatible service (AWS S3, Cloudflare R2, MinIO, ...). The
/// bucket is not part of the address; it travels with each
/// [`UploadTarget`](crate::UploadTarget).
///
/// This is infallible - URL validation happens when the address is handed to
/// a [`RequestAuthorizer`](crate::RequestAuthorizer).
///
/// # Examples
///
/// ```
/// use s3_presign::Address;
///
/// // AWS S3
/// let addr = Address::new("https://s3.us-east-1.amazonaws.com", "us-east-1");
///
/// // Cloudflare R2
/// let addr = Address::new("https://account-id.r2.cloudflarestorage.com", "auto");
///
/// // MinIO (local development)
/// let addr = Address::new("http://localhost:9000", "us-east-1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// The S3-compatible endpoint URL (e.g., "https://s3.us-east-1.amazonaws.com")
    endpoint: String,
    /// AWS region for signing (e.g., "us-east-1", "auto" for R2)
    region: String,
}

impl Address {
    /// Create a new address with the given endpoint and region.
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
        }
    }

    /// Address of the regional AWS S3 endpoint.
    pub fn aws(region: impl Into<String>) -> Self {
        let region = region.into();
        Self::new(format!("https://s3.{}.amazonaws.com", region), region)
    }

    /// Get the endpoint URL string.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the region.
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Determine if path-style URLs should be used by default for this endpoint.
///
/// Returns true for IP addresses and localhost, since virtual-hosted style
/// URLs require DNS resolution of `{bucket}.{host}`.
pub fn is_path_style_default(endpoint: &Url) -> bool {
    use url::Host;
    match endpoint.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => domain == "localhost",
        None => false,
    }
}

/// Build the URL of an object.
///
/// Handles both path-style and virtual-hosted style URLs. `key` must already
/// be percent-encoded and is appended verbatim after a `/`, so a key starting
/// with `/` yields an empty segment. A path prefix on the endpoint is kept.
pub(crate) fn build_url(
    endpoint: &Url,
    bucket: &str,
    key: &str,
    path_style: bool,
) -> Result<Url, AuthError> {
    let prefix = endpoint.path().trim_end_matches('/');
    let mut url = endpoint.clone();

    if path_style {
        // Path-style: https://endpoint/bucket/key
        url.set_path(&format!("{}/{}/{}", prefix, bucket, key));
    } else {
        // Virtual-hosted style: https://bucket.endpoint/key
        let host = endpoint
            .host_str()
            .ok_or_else(|| AuthError::SigningFailed("invalid endpoint: no host".into()))?;
        let new_host = format!("{}.{}", bucket, host);

        url.set_host(Some(&new_host))
            .map_err(|e| AuthError::SigningFailed(format!("invalid host {}: {}", new_host, e)))?;
        url.set_path(&format!("{}/{}", prefix, key));
    }

    Ok(url)
}

/// Extract host string from URL, including port for non-standard ports.
pub(crate) fn extract_host(url: &Url) -> Result<String, AuthError> {
    let hostname = url
        .host_str()
        .ok_or_else(|| AuthError::SigningFailed("URL missing host".into()))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", hostname, port),
        None => hostname.to_string(),
    })
}
