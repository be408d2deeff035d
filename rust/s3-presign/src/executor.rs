//! Execution of signed uploads.

use http::StatusCode;

use crate::{HttpTransport, Payload, SignedAuthorization, Transport, TransferError};

/// Result of an upload the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Status code returned by the backend
    pub status: StatusCode,
    /// Whether the status is in the 2xx range
    pub succeeded: bool,
    /// ETag of the stored object, when the backend sent one
    pub etag: Option<String>,
}

/// Performs presigned uploads over a [`Transport`].
///
/// The executor sends exactly what the authorization describes: its method,
/// URL and headers verbatim, with the payload as body. It does not look at the
/// checksum; the backend recomputes it from the received bytes and refuses the
/// upload if it disagrees with the signed header.
#[derive(Debug, Clone, Default)]
pub struct UploadExecutor<T = HttpTransport> {
    transport: T,
}

impl UploadExecutor<HttpTransport> {
    /// Create an executor using a default [`HttpTransport`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Transport> UploadExecutor<T> {
    /// Create an executor sending through `transport`.
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// The transport requests go through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport, e.g. to tap it.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send `payload` as authorized by `authorization`.
    ///
    /// Performs a single request. A 2xx response is a [`TransferOutcome`];
    /// any other status is [`TransferError::Rejected`] with the backend's
    /// body, and a failure to get a response at all is
    /// [`TransferError::Network`].
    pub async fn execute(
        &self,
        authorization: &SignedAuthorization,
        payload: &Payload,
    ) -> Result<TransferOutcome, TransferError> {
        let request = build_request(authorization, payload)?;

        let response = self.transport.send(request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = TransferError::Rejected { status, body };
            tracing::warn!(
                %status,
                code = error.code().unwrap_or("unknown"),
                url = %authorization.url.path(),
                "upload rejected"
            );
            return Err(error);
        }

        let etag = response
            .headers()
            .get(http::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_matches('"').to_string());

        tracing::debug!(
            %status,
            url = %authorization.url.path(),
            bytes = payload.len(),
            "upload accepted"
        );

        Ok(TransferOutcome {
            status,
            succeeded: true,
            etag,
        })
    }
}

fn build_request(
    authorization: &SignedAuthorization,
    payload: &Payload,
) -> Result<reqwest::Request, TransferError> {
    if !matches!(authorization.url.scheme(), "http" | "https") {
        return Err(TransferError::Request(format!(
            "unsupported URL scheme {:?}",
            authorization.url.scheme()
        )));
    }

    if let Some(declared) = authorization.header(http::header::CONTENT_LENGTH.as_str()) {
        let matches = declared
            .parse::<u64>()
            .map(|length| length == payload.len())
            .unwrap_or(false);
        if !matches {
            return Err(TransferError::Request(format!(
                "authorized content-length {} does not match payload of {} bytes",
                declared,
                payload.len()
            )));
        }
    }

    let mut request =
        reqwest::Request::new(authorization.method.clone(), authorization.url.clone());
    *request.headers_mut() = authorization.headers.clone();
    *request.body_mut() = Some(reqwest::Body::from(payload.bytes()));

    Ok(request)
}
