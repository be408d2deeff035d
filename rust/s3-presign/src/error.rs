//! Error types for authorization and transfer.
//!
//! The two halves of an upload fail for different reasons and call for
//! different remediation, so they get separate types: [`AuthError`] means no
//! signed request could be produced (fix credentials or configuration), while
//! [`TransferError`] means a request was produced and either never reached the
//! backend or was refused by it (fix payload, timing, or retry).

use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while producing a [`SignedAuthorization`](crate::SignedAuthorization).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No usable credentials could be resolved from the provider.
    #[error("credentials unavailable: {0}")]
    CredentialsUnavailable(String),

    /// The request could not be canonicalized or signed (malformed bucket or
    /// key, expiry out of range, header value that cannot be sent).
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// The authorizer was constructed with an unusable address.
    #[error("invalid authorizer configuration: {0}")]
    Configuration(String),
}

/// Errors that can occur while executing a signed upload.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The request never produced a response (connect failure, timeout,
    /// broken connection).
    #[error("network failure: {0}")]
    Network(String),

    /// The backend answered with a non-success status. This covers checksum
    /// mismatches, expired authorizations and signature failures alike.
    #[error("upload rejected with status {status}")]
    Rejected {
        /// Status code returned by the backend
        status: StatusCode,
        /// Response body, usually an S3 XML error document
        body: String,
    },

    /// The signed authorization could not be turned into an HTTP request.
    #[error("could not build upload request: {0}")]
    Request(String),
}

impl TransferError {
    /// The status code of a rejected transfer.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The S3 error code (e.g. `BadDigest`, `AccessDenied`) of a rejected
    /// transfer, if the backend returned an XML error document.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { body, .. } => {
                let start = body.find("<Code>")? + "<Code>".len();
                let end = body[start..].find("</Code>")? + start;
                Some(&body[start..end])
            }
            _ => None,
        }
    }

    /// Whether a fresh attempt could reasonably succeed without changing the
    /// payload or credentials.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_builder() {
            TransferError::Request(error.to_string())
        } else {
            TransferError::Network(error.to_string())
        }
    }
}

/// Either half of an end-to-end [`Upload`](crate::Upload) failing.
#[derive(Error, Debug)]
pub enum UploadError {
    /// No authorization could be produced.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The authorized transfer failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Errors that can occur while reading [`Config`](crate::Config) from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value {value:?} for environment variable {name}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAD_DIGEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>BadDigest</Code><Message>The SHA256 you specified did not match the calculated checksum.</Message></Error>"#;

    #[test]
    fn it_extracts_s3_error_code_from_rejection() {
        let error = TransferError::Rejected {
            status: StatusCode::BAD_REQUEST,
            body: BAD_DIGEST.into(),
        };

        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(error.code(), Some("BadDigest"));
        assert!(!error.is_network());
    }

    #[test]
    fn it_has_no_code_without_error_document() {
        let error = TransferError::Rejected {
            status: StatusCode::FORBIDDEN,
            body: String::new(),
        };
        assert_eq!(error.code(), None);

        let error = TransferError::Network("connection refused".into());
        assert_eq!(error.code(), None);
        assert_eq!(error.status(), None);
        assert!(error.is_network());
    }

    #[test]
    fn it_distinguishes_authorization_from_transfer_failures() {
        let auth = AuthError::CredentialsUnavailable("AWS_ACCESS_KEY_ID is not set".into());
        assert_eq!(
            auth.to_string(),
            "credentials unavailable: AWS_ACCESS_KEY_ID is not set"
        );

        let transfer = TransferError::Rejected {
            status: StatusCode::FORBIDDEN,
            body: String::new(),
        };
        assert_eq!(
            transfer.to_string(),
            "upload rejected with status 403 Forbidden"
        );

        let upload: UploadError = transfer.into();
        assert!(matches!(upload, UploadError::Transfer(_)));
        assert_eq!(upload.to_string(), "upload rejected with status 403 Forbidden");
    }
}
