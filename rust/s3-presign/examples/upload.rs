//! Upload a short poem with a checksum-bound presigned request and dump the
//! HTTP exchange.
//!
//! Reads `S3_BUCKET` (required), `S3_ENDPOINT`, `AWS_REGION`, `S3_PATH_STYLE`
//! and the usual `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
//! `AWS_SESSION_TOKEN` variables. Set `RUST_LOG=s3_presign=debug` for signing
//! details.

use std::time::Duration;

use anyhow::Result;
use s3_presign::{
    Config, DiagnosticTap, EnvironmentCredentials, HttpTransport, Upload, UploadExecutor,
};
use tracing_subscriber::EnvFilter;

const KEY: &str = "798798";

const POEM: &str = "
And both that morning equally lay
In leaves no step had trodden black.
Oh, I kept the first for another day!
Yet knowing how way leads on to way,
I doubted if I should ever come back.
";

#[tokio::main]
pub async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let authorizer = config.authorizer(EnvironmentCredentials)?;

    let upload = Upload::new(config.target(KEY), POEM)
        .with_expiry(Duration::from_secs(3600))
        .authorize(&authorizer)?;

    let mut executor = UploadExecutor::with_transport(DiagnosticTap::new(HttpTransport::new()));
    let mut exchanges = executor.transport_mut().tap()?;

    let result = upload.execute(&executor).await;

    while let Ok(exchange) = exchanges.try_recv() {
        println!("{}\n", exchange);
    }

    let outcome = result?;
    println!("status {}", outcome.status);

    Ok(())
}
