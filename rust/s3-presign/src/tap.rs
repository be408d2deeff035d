//! Wire-level observation of transport traffic.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use reqwest::ResponseBuilderExt;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::Transport;

/// Errors from attaching or detaching a tap.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapError {
    /// `tap` was called while a receiver is already attached.
    #[error("attempt to tap already-tapped transport")]
    AlreadyTapped,
    /// `untap` was called with no receiver attached.
    #[error("attempt to untap already-untapped transport")]
    NotTapped,
}

/// One request and whatever came back for it, rendered as on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Request line, headers and body
    pub request: String,
    /// Status line, headers and body, or the transport error
    pub response: Result<String, String>,
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.request)?;
        match &self.response {
            Ok(response) => write!(f, "{}", response),
            Err(error) => write!(f, "transport error: {}", error),
        }
    }
}

/// A [`Transport`] decorator that records every exchange.
///
/// Each exchange is logged at `debug` under the `s3_presign::tap` target and,
/// while tapped, sent to the receiver returned by [`tap`](Self::tap). The
/// response given back to the caller carries the original URL, status,
/// version, headers and body, and transport errors are returned unchanged.
#[derive(Clone)]
pub struct DiagnosticTap<T> {
    transport: T,
    tx: Option<UnboundedSender<Exchange>>,
}

impl<T: Transport> DiagnosticTap<T> {
    /// Wrap `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            tx: None,
        }
    }

    /// Start forwarding exchanges to the returned receiver.
    pub fn tap(&mut self) -> Result<UnboundedReceiver<Exchange>, TapError> {
        if self.tx.is_some() {
            return Err(TapError::AlreadyTapped);
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.tx = Some(tx);

        Ok(rx)
    }

    /// Stop forwarding exchanges.
    pub fn untap(&mut self) -> Result<(), TapError> {
        if self.tx.is_none() {
            return Err(TapError::NotTapped);
        }

        self.tx = None;
        Ok(())
    }

    /// Whether a receiver is attached.
    pub fn is_tapped(&self) -> bool {
        self.tx.is_some()
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.transport
    }

    fn record(&self, exchange: Exchange) {
        tracing::debug!(target: "s3_presign::tap", "\n{}", exchange);

        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is listening anymore.
            let _ = tx.send(exchange);
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for DiagnosticTap<T> {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        let rendered = render_request(&request);

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                self.record(Exchange {
                    request: rendered,
                    response: Err(error.to_string()),
                });
                return Err(error);
            }
        };

        let status = response.status();
        let version = response.version();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(error) => {
                self.record(Exchange {
                    request: rendered,
                    response: Err(error.to_string()),
                });
                return Err(error);
            }
        };

        self.record(Exchange {
            request: rendered,
            response: Ok(render_response(status, version, &headers, &body)),
        });

        let mut builder = http::Response::builder()
            .status(status)
            .version(version)
            .url(url);
        if let Some(map) = builder.headers_mut() {
            *map = headers;
        }
        // The parts come from a valid response, so the builder cannot fail.
        let rebuilt = builder
            .body(body.clone())
            .unwrap_or_else(|_| http::Response::new(body));

        Ok(reqwest::Response::from(rebuilt))
    }
}

fn render_request(request: &reqwest::Request) -> String {
    let url = request.url();
    let target = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };

    let mut rendered = format!("{} {} {:?}\r\n", request.method(), target, request.version());

    if !request.headers().contains_key(http::header::HOST) {
        if let Some(host) = url.host_str() {
            match url.port() {
                Some(port) => rendered.push_str(&format!("host: {}:{}\r\n", host, port)),
                None => rendered.push_str(&format!("host: {}\r\n", host)),
            }
        }
    }
    render_headers(&mut rendered, request.headers());
    rendered.push_str("\r\n");

    if let Some(body) = request.body().and_then(|body| body.as_bytes()) {
        rendered.push_str(&String::from_utf8_lossy(body));
    }

    rendered
}

fn render_response(
    status: StatusCode,
    version: Version,
    headers: &HeaderMap,
    body: &Bytes,
) -> String {
    let mut rendered = format!("{:?} {}\r\n", version, status);
    render_headers(&mut rendered, headers);
    rendered.push_str("\r\n");
    rendered.push_str(&String::from_utf8_lossy(body));
    rendered
}

fn render_headers(rendered: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        rendered.push_str(name.as_str());
        rendered.push_str(": ");
        rendered.push_str(&String::from_utf8_lossy(value.as_bytes()));
        rendered.push_str("\r\n");
    }
}
