//! AWS Signature Version 4 [query string authentication].
//!
//! [query string authentication]: https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-query-string-auth.html

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt::Write as FmtWrite;
use url::Url;

use crate::Credentials;

pub(crate) const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub(crate) const SERVICE: &str = "s3";
pub(crate) const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Everything that goes into a presigned URL signature.
pub(crate) struct Presign<'a> {
    pub method: &'a str,
    pub url: &'a Url,
    pub region: &'a str,
    pub time: DateTime<Utc>,
    pub expires: u64,
    /// Signed headers as lowercase name and trimmed value
    pub headers: &'a [(String, String)],
    /// Extra signed query parameters
    pub query: &'a [(String, String)],
    /// Whether to escape the path a second time when canonicalizing
    pub escape_path: bool,
}

impl Presign<'_> {
    /// Sign with `credentials`, returning the URL with every signing
    /// parameter and the signature attached.
    pub fn sign(&self, credentials: &Credentials) -> Url {
        let timestamp = self.time.format("%Y%m%dT%H%M%SZ").to_string();
        let date = &timestamp[0..8];

        let key = SigningKey::derive(&credentials.secret_access_key, date, self.region, SERVICE);
        let scope = format!("{}/{}/{}/aws4_request", date, self.region, SERVICE);

        let mut headers = self.headers.to_vec();
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers = signed_header_names(&headers);

        let mut query_params: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".into(), ALGORITHM.into()),
            ("X-Amz-Content-Sha256".into(), UNSIGNED_PAYLOAD.into()),
            (
                "X-Amz-Credential".into(),
                format!("{}/{}", credentials.access_key_id, scope),
            ),
            ("X-Amz-Date".into(), timestamp.clone()),
            ("X-Amz-Expires".into(), self.expires.to_string()),
            ("X-Amz-SignedHeaders".into(), signed_headers.clone()),
        ];
        if let Some(token) = &credentials.session_token {
            query_params.push(("X-Amz-Security-Token".into(), token.clone()));
        }
        query_params.extend(self.query.iter().cloned());
        query_params.sort();

        let canonical_uri = if self.escape_path {
            percent_encode_path(self.url.path())
        } else {
            self.url.path().to_string()
        };

        let canonical_query: String = query_params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}", k, canonical_header_value(v)))
            .collect::<Vec<_>>()
            .join("\n");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n\n{}\n{}",
            self.method,
            canonical_uri,
            canonical_query,
            canonical_headers,
            signed_headers,
            UNSIGNED_PAYLOAD
        );

        let digest = Sha256::digest(canonical_request.as_bytes());
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            timestamp,
            scope,
            hex_encode(&digest)
        );

        let signature = key.sign(string_to_sign.as_bytes());

        // The transmitted query must be byte-identical to the canonical one.
        let mut url = self.url.clone();
        url.set_query(Some(&format!(
            "{}&X-Amz-Signature={}",
            canonical_query, signature
        )));
        url
    }
}

/// `;` separated list of sorted header names.
pub(crate) fn signed_header_names(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// Header value as it enters the canonical request: trimmed, with every run
/// of spaces inside collapsed to one.
pub(crate) fn canonical_header_value(value: &str) -> String {
    value.split(' ').filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ")
}

/// AWS SigV4 signing key derived from credentials.
///
/// The key is derived through an HMAC chain:
/// `HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`
#[derive(Clone)]
struct SigningKey(Vec<u8>);

impl SigningKey {
    fn derive(secret: &str, date: &str, region: &str, service: &str) -> Self {
        let secret = format!("AWS4{}", secret);
        let k_date = Self::hmac(secret.as_bytes(), date.as_bytes());
        let k_region = Self::hmac(&k_date, region.as_bytes());
        let k_service = Self::hmac(&k_region, service.as_bytes());
        Self(Self::hmac(&k_service, b"aws4_request"))
    }

    fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any size");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    fn sign(&self, data: &[u8]) -> Signature {
        Signature(Self::hmac(&self.0, data))
    }
}

/// HMAC-SHA256 signature bytes, displayed as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature(Vec<u8>);

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex_encode(&self.0))
    }
}

/// Get the current time as a UTC datetime.
pub(crate) fn current_time() -> DateTime<Utc> {
    Utc::now()
}

/// Encode bytes as lowercase hexadecimal string.
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(s, "{:02x}", byte);
    }
    s
}

/// Percent-encode a string according to RFC 3986.
///
/// Unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) are not encoded.
/// All other bytes are encoded as `%XX` where XX is the uppercase hex value.
pub(crate) fn percent_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                let _ = write!(result, "%{:02X}", byte);
            }
        }
    }
    result
}

/// Like [`percent_encode`], but keeps `/` so key hierarchy survives.
pub(crate) fn percent_encode_path(path: &str) -> String {
    percent_encode(path).replace("%2F", "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 7, 5, 48, 59).unwrap()
    }

    #[test]
    fn it_hex_encodes_bytes() {
        assert_eq!(hex_encode(&[0x01, 0x02, 0x03, 0x0A, 0x0F]), "0102030a0f");
    }

    #[test]
    fn it_percent_encodes_strings() {
        assert_eq!(percent_encode("abc123"), "abc123");
        assert_eq!(percent_encode("a b+c"), "a%20b%2Bc");
        assert_eq!(percent_encode("test/path"), "test%2Fpath");
        assert_eq!(percent_encode("~tilde_dot."), "~tilde_dot.");
    }

    #[test]
    fn it_keeps_slashes_in_paths() {
        assert_eq!(percent_encode_path("a b/c+d"), "a%20b/c%2Bd");
        assert_eq!(percent_encode_path("/b/a%20b"), "/b/a%2520b");
    }

    #[test]
    fn it_collapses_spaces_in_header_values() {
        assert_eq!(canonical_header_value("text/plain"), "text/plain");
        assert_eq!(
            canonical_header_value("  text/plain;   charset=utf-8 "),
            "text/plain; charset=utf-8"
        );
        assert_eq!(canonical_header_value("a  b c"), "a b c");
    }

    #[test]
    fn it_signs_values_differing_only_in_inner_spaces_alike() {
        let credentials = Credentials::new("my-id", "top secret");
        let url = Url::parse("https://pale.s3.auto.amazonaws.com/file").unwrap();
        let sign = |content_type: &str| {
            let headers = vec![
                ("content-type".to_string(), content_type.to_string()),
                ("host".to_string(), "pale.s3.auto.amazonaws.com".to_string()),
            ];
            Presign {
                method: "PUT",
                url: &url,
                region: "auto",
                time: test_time(),
                expires: 3600,
                headers: &headers,
                query: &[],
                escape_path: false,
            }
            .sign(&credentials)
        };

        assert_eq!(sign("text/plain;  charset=utf-8"), sign("text/plain; charset=utf-8"));
        assert_ne!(sign("text/plain;charset=utf-8"), sign("text/plain; charset=utf-8"));
    }

    #[test]
    fn it_derives_the_documented_signing_key() {
        // Example from the AWS SigV4 documentation.
        let key = SigningKey::derive(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex_encode(&key.0),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn it_lists_signed_header_names() {
        let headers = vec![
            ("content-type".to_string(), "text/plain".to_string()),
            ("host".to_string(), "example.com".to_string()),
        ];
        assert_eq!(signed_header_names(&headers), "content-type;host");
    }

    #[test]
    fn it_signs_deterministically() {
        let credentials = Credentials::new("my-id", "top secret");
        let url = Url::parse("https://pale.s3.auto.amazonaws.com/file/path").unwrap();
        let headers = vec![("host".to_string(), "pale.s3.auto.amazonaws.com".to_string())];
        let presign = Presign {
            method: "PUT",
            url: &url,
            region: "auto",
            time: test_time(),
            expires: 3600,
            headers: &headers,
            query: &[],
            escape_path: false,
        };

        let first = presign.sign(&credentials);
        let second = presign.sign(&credentials);
        assert_eq!(first, second);
        assert!(first.as_str().contains("X-Amz-Date=20250507T054859Z"));
        assert!(
            first
                .as_str()
                .contains("X-Amz-Credential=my-id%2F20250507%2Fauto%2Fs3%2Faws4_request")
        );
    }

    #[test]
    fn it_gets_reasonable_current_time() {
        let year: i32 = current_time().format("%Y").to_string().parse().unwrap();
        assert!(year >= 2024, "year out of range: {}", year);
    }
}
