#![warn(missing_docs)]

//! Checksum-bound presigned uploads for S3-compatible storage.
//!
//! This crate grants time-limited, SigV4-signed permission to upload one
//! specific payload to one object key, and optionally performs that upload.
//! The SHA-256 digest of the payload is committed to in a signed
//! `x-amz-checksum-sha256` header, so whoever holds the authorization can
//! neither strip the checksum nor upload different bytes: the backend
//! recomputes the digest of what it receives and refuses a mismatch.
//!
//! Works with AWS S3 and S3-compatible services such as Cloudflare R2 and
//! MinIO.
//!
//! # Flow
//!
//! 1. Capture the bytes as a [`Payload`] and digest them ([`Payload::checksum`]).
//! 2. Describe the upload with an [`AuthorizationRequest`] (or let [`Upload`]
//!    derive it from the payload).
//! 3. Sign it with a [`RequestAuthorizer`], yielding a [`SignedAuthorization`]:
//!    method, presigned URL, the headers that must accompany it, and expiry.
//! 4. Send the same payload with an [`UploadExecutor`], optionally observing
//!    the traffic through a [`DiagnosticTap`].
//!
//! # Example
//!
//! ```no_run
//! use s3_presign::{Config, EnvironmentCredentials, Upload, UploadExecutor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let authorizer = config.authorizer(EnvironmentCredentials)?;
//!
//! let outcome = Upload::new(config.target("greeting.txt"), "hello")
//!     .with_content_type("text/plain")
//!     .send(&authorizer, &UploadExecutor::new())
//!     .await?;
//!
//! println!("stored with status {}", outcome.status);
//! # Ok(())
//! # }
//! ```

mod address;
pub use address::{Address, is_path_style_default};

mod authorization;
pub use authorization::*;

mod authorizer;
pub use authorizer::*;

mod checksum;
pub use checksum::*;

mod config;
pub use config::*;

mod credentials;
pub use credentials::*;

mod error;
pub use error::*;

mod executor;
pub use executor::*;

mod payload;
pub use payload::*;

mod tap;
pub use tap::*;

mod target;
pub use target::*;

mod transport;
pub use transport::*;

mod upload;
pub use upload::*;

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
