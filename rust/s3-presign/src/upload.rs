//! End-to-end uploads: capture, authorize, execute.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    Acl, AuthError, AuthorizationRequest, CredentialsProvider, Payload, RequestAuthorizer,
    SignedAuthorization, TransferError, TransferOutcome, Transport, UploadError, UploadExecutor,
    UploadTarget,
};

/// An upload whose payload has been captured but not yet authorized.
///
/// The checksum and content length are derived from the payload here, and
/// the same payload is what [`AuthorizedUpload::execute`] sends.
#[derive(Debug, Clone)]
pub struct Upload {
    request: AuthorizationRequest,
    payload: Payload,
}

impl Upload {
    /// Prepare an upload of `payload` to `target`.
    pub fn new(target: UploadTarget, payload: impl Into<Payload>) -> Self {
        let payload = payload.into();
        let request = AuthorizationRequest::new(target, payload.checksum(), payload.len());
        Self { request, payload }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.request = self.request.with_content_type(content_type);
        self
    }

    /// Set how long the authorization stays valid.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.request = self.request.with_expiry(expiry);
        self
    }

    /// Set the canned ACL of the uploaded object.
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.request = self.request.with_acl(acl);
        self
    }

    /// Set the storage class of the uploaded object.
    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.request = self.request.with_storage_class(storage_class);
        self
    }

    /// Attach a user metadata entry.
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_metadata(name, value);
        self
    }

    /// The authorization request derived from the payload.
    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// The captured payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Sign the upload now.
    pub fn authorize<P: CredentialsProvider>(
        self,
        authorizer: &RequestAuthorizer<P>,
    ) -> Result<AuthorizedUpload, AuthError> {
        let authorization = authorizer.authorize(&self.request)?;
        Ok(AuthorizedUpload {
            authorization,
            payload: self.payload,
        })
    }

    /// Sign the upload as if it were `time`.
    pub fn authorize_at<P: CredentialsProvider>(
        self,
        authorizer: &RequestAuthorizer<P>,
        time: DateTime<Utc>,
    ) -> Result<AuthorizedUpload, AuthError> {
        let authorization = authorizer.authorize_at(&self.request, time)?;
        Ok(AuthorizedUpload {
            authorization,
            payload: self.payload,
        })
    }

    /// Authorize and execute in one go.
    pub async fn send<P, T>(
        self,
        authorizer: &RequestAuthorizer<P>,
        executor: &UploadExecutor<T>,
    ) -> Result<TransferOutcome, UploadError>
    where
        P: CredentialsProvider,
        T: Transport,
    {
        let upload = self.authorize(authorizer)?;
        Ok(upload.execute(executor).await?)
    }
}

/// A signed upload paired with the payload it was signed for.
#[derive(Debug, Clone)]
pub struct AuthorizedUpload {
    authorization: SignedAuthorization,
    payload: Payload,
}

impl AuthorizedUpload {
    /// The signed authorization.
    pub fn authorization(&self) -> &SignedAuthorization {
        &self.authorization
    }

    /// The payload that will be sent.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Send the payload.
    pub async fn execute<T: Transport>(
        &self,
        executor: &UploadExecutor<T>,
    ) -> Result<TransferOutcome, TransferError> {
        executor.execute(&self.authorization, &self.payload).await
    }

    /// Split into the authorization and the payload, e.g. to hand the
    /// authorization to another party.
    pub fn into_parts(self) -> (SignedAuthorization, Payload) {
        (self.authorization, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, Credentials, Hasher, SignerOptions};

    #[test]
    fn it_derives_checksum_and_length_from_payload() {
        let upload = Upload::new(UploadTarget::new("bucket", "k"), "hello");

        assert_eq!(upload.request().content_length(), 5);
        assert_eq!(upload.request().checksum(), &Hasher::Sha256.checksum(b"hello"));
    }

    #[test]
    fn it_pairs_authorization_with_its_payload() -> anyhow::Result<()> {
        let authorizer = RequestAuthorizer::new(
            Address::aws("us-east-1"),
            Credentials::new("AKIDEXAMPLE", "secret"),
            SignerOptions::default(),
        )?;

        let upload = Upload::new(UploadTarget::new("bucket", "k"), "hello")
            .with_content_type("text/plain")
            .authorize(&authorizer)?;

        let (authorization, payload) = upload.into_parts();
        assert_eq!(payload.as_bytes(), b"hello");
        assert_eq!(authorization.header("content-type"), Some("text/plain"));
        assert_eq!(
            authorization.header("x-amz-checksum-sha256"),
            Some(payload.checksum().to_string().as_str())
        );
        Ok(())
    }
}
