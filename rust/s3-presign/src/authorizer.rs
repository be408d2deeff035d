//! Presigned upload authorization.
//!
//! A [`RequestAuthorizer`] turns an [`AuthorizationRequest`] into a
//! [`SignedAuthorization`] without sending any bytes. The payload checksum is
//! always carried in signed headers (`x-amz-checksum-sha256` and
//! `x-amz-sdk-checksum-algorithm`), never in the query string: backends
//! enforce the checksum header against the received body, while a checksum
//! query parameter is silently ignored.

mod sigv4;

use chrono::{DateTime, TimeDelta, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::address::{build_url, extract_host, is_path_style_default};
use crate::authorization::MAX_EXPIRY;
use crate::{Address, AuthError, AuthorizationRequest, CredentialsProvider, SignedAuthorization};

/// Header naming the checksum algorithm the backend must verify.
pub const CHECKSUM_ALGORITHM_HEADER: &str = "x-amz-sdk-checksum-algorithm";

/// Signer behaviour, fixed when the authorizer is constructed.
///
/// Both fields default to `true`, which is what S3 expects for checksummed
/// uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerOptions {
    /// Canonicalize the URL path exactly as it is transmitted. When `false`
    /// the path is escaped a second time, as generic SigV4 services expect.
    pub disable_uri_path_escaping: bool,
    /// Keep optional `x-amz-*` fields (metadata, ACL, storage class) as
    /// signed headers. When `false` they are moved into the query string.
    /// Checksum fields stay in headers regardless.
    pub disable_header_hoisting: bool,
}

impl Default for SignerOptions {
    fn default() -> Self {
        Self {
            disable_uri_path_escaping: true,
            disable_header_hoisting: true,
        }
    }
}

/// Produces presigned upload authorizations for one S3 address.
///
/// Authorization is a pure computation over the request, the credentials and
/// the clock, so a single authorizer can be shared across threads.
///
/// ```
/// use s3_presign::{
///     Address, AuthorizationRequest, Credentials, Payload, RequestAuthorizer, SignerOptions,
///     UploadTarget,
/// };
///
/// let authorizer = RequestAuthorizer::new(
///     Address::aws("us-east-1"),
///     Credentials::new("AKIDEXAMPLE", "secret"),
///     SignerOptions::default(),
/// )?;
///
/// let payload = Payload::from("hello");
/// let request = AuthorizationRequest::new(
///     UploadTarget::new("my-bucket", "greeting.txt"),
///     payload.checksum(),
///     payload.len(),
/// );
/// let authorization = authorizer.authorize(&request)?;
/// assert_eq!(authorization.header("x-amz-sdk-checksum-algorithm"), Some("SHA256"));
/// # Ok::<(), s3_presign::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RequestAuthorizer<P> {
    address: Address,
    endpoint: Url,
    provider: P,
    options: SignerOptions,
    path_style: bool,
}

impl<P: CredentialsProvider> RequestAuthorizer<P> {
    /// Create an authorizer for `address`, signing with credentials resolved
    /// from `provider`.
    ///
    /// Fails with [`AuthError::Configuration`] if the endpoint is not an
    /// absolute `http`/`https` URL with a host, or the region is empty.
    pub fn new(address: Address, provider: P, options: SignerOptions) -> Result<Self, AuthError> {
        let endpoint = Url::parse(address.endpoint()).map_err(|error| {
            AuthError::Configuration(format!(
                "invalid endpoint {:?}: {}",
                address.endpoint(),
                error
            ))
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AuthError::Configuration(format!(
                "unsupported endpoint scheme {:?}",
                endpoint.scheme()
            )));
        }
        if endpoint.host_str().is_none() {
            return Err(AuthError::Configuration("endpoint has no host".into()));
        }
        if address.region().is_empty() {
            return Err(AuthError::Configuration("region is empty".into()));
        }

        let path_style = is_path_style_default(&endpoint);

        Ok(Self {
            address,
            endpoint,
            provider,
            options,
            path_style,
        })
    }

    /// Force path-style (`true`) or virtual-hosted style (`false`) URLs.
    pub fn with_path_style(mut self, path_style: bool) -> Self {
        self.path_style = path_style;
        self
    }

    /// The address requests are signed for.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The signer options in effect.
    pub fn options(&self) -> SignerOptions {
        self.options
    }

    /// Sign `request` at the current time.
    pub fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<SignedAuthorization, AuthError> {
        self.authorize_at(request, sigv4::current_time())
    }

    /// Sign `request` as if it were `time`.
    ///
    /// The result is a pure function of the request, the credentials, the
    /// options and `time`.
    pub fn authorize_at(
        &self,
        request: &AuthorizationRequest,
        time: DateTime<Utc>,
    ) -> Result<SignedAuthorization, AuthError> {
        let target = request.target();
        target.validate()?;

        let expiry = request.expiry();
        if expiry > MAX_EXPIRY {
            return Err(AuthError::SigningFailed(format!(
                "expiry of {}s exceeds the maximum of {}s",
                expiry.as_secs(),
                MAX_EXPIRY.as_secs()
            )));
        }
        let expires = expiry.as_secs();

        let credentials = self.provider.resolve()?;

        let key = sigv4::percent_encode_path(target.key());
        let url = build_url(&self.endpoint, target.bucket(), &key, self.path_style)?;
        let host = extract_host(&url)?;

        let checksum = request.checksum();
        let hasher = checksum.algorithm();

        let mut headers: Vec<(String, String)> = vec![
            ("host".into(), host),
            (
                "content-length".into(),
                request.content_length().to_string(),
            ),
            (
                "content-type".into(),
                request.content_type().trim().to_string(),
            ),
            (hasher.header_name().into(), checksum.to_string()),
            (CHECKSUM_ALGORITHM_HEADER.into(), hasher.as_str().into()),
        ];

        let optional = optional_fields(request)?;
        let hoisted = if self.options.disable_header_hoisting {
            headers.extend(optional);
            Vec::new()
        } else {
            optional
        };
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let header_map = to_header_map(&headers)?;

        let url = sigv4::Presign {
            method: Method::PUT.as_str(),
            url: &url,
            region: self.address.region(),
            time,
            expires,
            headers: &headers,
            query: &hoisted,
            escape_path: !self.options.disable_uri_path_escaping,
        }
        .sign(&credentials);

        let valid_until = time + TimeDelta::seconds(expires as i64);

        tracing::debug!(
            bucket = target.bucket(),
            key = target.key(),
            expires,
            signed_headers = %sigv4::signed_header_names(&headers),
            hoisted = hoisted.len(),
            "authorized upload"
        );

        Ok(SignedAuthorization {
            method: Method::PUT,
            url,
            headers: header_map,
            valid_until,
        })
    }
}

/// Metadata, ACL and storage class fields, which may be hoisted.
fn optional_fields(request: &AuthorizationRequest) -> Result<Vec<(String, String)>, AuthError> {
    let mut fields = Vec::new();

    if let Some(acl) = request.acl() {
        fields.push(("x-amz-acl".to_string(), acl.as_str().to_string()));
    }
    if let Some(storage_class) = request.storage_class() {
        fields.push((
            "x-amz-storage-class".to_string(),
            storage_class.trim().to_string(),
        ));
    }
    for (name, value) in request.metadata() {
        if name.is_empty() {
            return Err(AuthError::SigningFailed("metadata name is empty".into()));
        }
        fields.push((format!("x-amz-meta-{}", name), value.trim().to_string()));
    }

    Ok(fields)
}

fn to_header_map(headers: &[(String, String)]) -> Result<HeaderMap, AuthError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|error| {
            AuthError::SigningFailed(format!("invalid header name {:?}: {}", name, error))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|error| {
            AuthError::SigningFailed(format!("invalid value for header {}: {}", name, error))
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
