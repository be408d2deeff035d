//! In-memory S3-compatible test server.
//!
//! The backend behaves like S3 where uploads are concerned: it verifies the
//! presigned signature, recomputes `x-amz-checksum-sha256` over the received
//! body and refuses presigned requests past their `X-Amz-Expires` window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{NaiveDateTime, TimeDelta, Utc};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use s3s::dto::{
    ETag, GetObjectInput, GetObjectOutput, PutObjectInput, PutObjectOutput, StreamingBlob,
    Timestamp,
};
use s3s::service::S3ServiceBuilder;
use s3s::{S3, S3Request, S3Response, S3Result, s3_error};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::{Address, Credentials, Hasher};

/// Access key ID the test server accepts.
pub const TEST_ACCESS_KEY_ID: &str = "test-access-key";
/// Secret access key the test server accepts.
pub const TEST_SECRET_ACCESS_KEY: &str = "test-secret-key";
/// Region the test server is addressed with.
pub const TEST_REGION: &str = "us-east-1";

/// An object held by [`InMemoryS3`].
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object bytes
    pub data: Bytes,
    /// Content type sent with the upload
    pub content_type: Option<String>,
    /// Hex MD5 of the data
    pub e_tag: String,
    /// Checksum sent with the upload
    pub checksum_sha256: Option<String>,
    last_modified: Timestamp,
}

/// Bucket name -> key -> object.
#[derive(Clone, Default)]
pub struct InMemoryS3 {
    buckets: Arc<RwLock<HashMap<String, HashMap<String, StoredObject>>>>,
}

impl InMemoryS3 {
    /// Create a bucket if it doesn't exist.
    pub async fn create_bucket(&self, bucket: &str) {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
    }

    /// Look up a stored object.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.buckets.read().await.get(bucket)?.get(key).cloned()
    }
}

/// Reject presigned requests whose `X-Amz-Date` + `X-Amz-Expires` is past.
fn check_presigned_expiry(query: Option<&str>) -> S3Result<()> {
    let Some(query) = query else {
        return Ok(());
    };

    let mut date = None;
    let mut expires = None;
    for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match name.as_ref() {
            "X-Amz-Date" => date = Some(value.into_owned()),
            "X-Amz-Expires" => expires = Some(value.into_owned()),
            _ => {}
        }
    }

    let (Some(date), Some(expires)) = (date, expires) else {
        return Ok(());
    };

    let signed_at = NaiveDateTime::parse_from_str(&date, "%Y%m%dT%H%M%SZ")
        .map_err(|_| s3_error!(InvalidArgument, "Malformed X-Amz-Date"))?
        .and_utc();
    let expires = expires
        .parse::<i64>()
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| s3_error!(InvalidArgument, "Malformed X-Amz-Expires"))?;

    if Utc::now() > signed_at + expires {
        return Err(s3_error!(AccessDenied, "Request has expired"));
    }
    Ok(())
}

#[async_trait]
impl S3 for InMemoryS3 {
    async fn get_object(
        &self,
        req: S3Request<GetObjectInput>,
    ) -> S3Result<S3Response<GetObjectOutput>> {
        let object = self
            .object(&req.input.bucket, &req.input.key)
            .await
            .ok_or_else(|| s3_error!(NoSuchKey))?;

        let content_type = object.content_type.as_ref().and_then(|s| s.parse().ok());
        let output = GetObjectOutput {
            content_length: Some(object.data.len() as i64),
            body: Some(StreamingBlob::from(s3s::Body::from(object.data))),
            content_type,
            e_tag: Some(ETag::Strong(object.e_tag)),
            last_modified: Some(object.last_modified),
            ..Default::default()
        };
        Ok(S3Response::new(output))
    }

    async fn put_object(
        &self,
        req: S3Request<PutObjectInput>,
    ) -> S3Result<S3Response<PutObjectOutput>> {
        check_presigned_expiry(req.uri.query())?;

        let bucket = req.input.bucket.clone();
        let key = req.input.key.clone();
        let content_type = req.input.content_type.as_ref().map(|m| m.to_string());
        let checksum_sha256 = req.input.checksum_sha256.clone();

        let mut data = Vec::new();
        if let Some(mut body) = req.input.body {
            use futures_util::StreamExt;
            while let Some(chunk) = body.next().await {
                let chunk = chunk
                    .map_err(|_| s3_error!(InvalidRequest, "Could not read request body"))?;
                data.extend_from_slice(&chunk);
            }
        }

        if let Some(expected) = &checksum_sha256 {
            let actual = Hasher::Sha256.checksum(&data).to_string();
            if &actual != expected {
                return Err(s3_error!(
                    BadDigest,
                    "The SHA256 you specified did not match the calculated checksum."
                ));
            }
        }

        let e_tag = format!("{:x}", md5::compute(&data));
        let stored = StoredObject {
            data: Bytes::from(data),
            content_type,
            e_tag: e_tag.clone(),
            checksum_sha256: checksum_sha256.clone(),
            last_modified: Timestamp::from(SystemTime::now()),
        };

        let mut buckets = self.buckets.write().await;
        let objects = buckets.get_mut(&bucket).ok_or_else(|| s3_error!(NoSuchBucket))?;
        objects.insert(key, stored);

        let output = PutObjectOutput {
            e_tag: Some(ETag::Strong(e_tag)),
            checksum_sha256,
            ..Default::default()
        };
        Ok(S3Response::new(output))
    }
}

/// A running S3 test server instance.
pub struct LocalS3 {
    /// The endpoint URL where the server is listening
    pub endpoint: String,
    storage: InMemoryS3,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl LocalS3 {
    /// Start a server accepting the test credentials, with `buckets` created.
    pub async fn start(buckets: &[&str]) -> anyhow::Result<Self> {
        let storage = InMemoryS3::default();
        for bucket in buckets {
            storage.create_bucket(bucket).await;
        }

        let mut builder = S3ServiceBuilder::new(storage.clone());
        builder.set_auth(s3s::auth::SimpleAuth::from_single(
            TEST_ACCESS_KEY_ID,
            TEST_SECRET_ACCESS_KEY,
        ));
        let service = builder.build();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = format!("http://{}", listener.local_addr()?);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = listener.accept() => {
                        if let Ok((stream, _)) = result {
                            let hyper_service = TowerToHyperService::new(service.clone());
                            tokio::spawn(async move {
                                let _ = http1::Builder::new()
                                    .serve_connection(TokioIo::new(stream), hyper_service)
                                    .await;
                            });
                        }
                    }
                }
            }
        });

        Ok(Self {
            endpoint,
            storage,
            shutdown_tx,
        })
    }

    /// Address of the server.
    pub fn address(&self) -> Address {
        Address::new(self.endpoint.clone(), TEST_REGION)
    }

    /// Credentials the server accepts.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(TEST_ACCESS_KEY_ID, TEST_SECRET_ACCESS_KEY)
    }

    /// The backing store, for inspecting what was uploaded.
    pub fn storage(&self) -> &InMemoryS3 {
        &self.storage
    }

    /// Stop the server.
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}
