//! The HTTP seam between the executor and the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::TransferError;

/// Sends one HTTP request and returns its response.
///
/// Implementations must hand back the response as received; status and
/// body interpretation belong to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform `request`.
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error>;
}

/// [`Transport`] backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with reqwest's defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose requests time out after `timeout`.
    ///
    /// Fails if the TLS backend or system configuration cannot be loaded.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                TransferError::Request(format!("failed to build HTTP client: {}", error))
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        self.client.execute(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        (**self).send(request).await
    }
}
