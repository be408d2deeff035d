//! Service configuration.

use serde::{Deserialize, Serialize};

use crate::{
    Address, AuthError, ConfigError, CredentialsProvider, RequestAuthorizer, SignerOptions,
    UploadTarget,
};

/// Environment variable naming the destination bucket.
pub const BUCKET_VAR: &str = "S3_BUCKET";
/// Environment variable overriding the S3 endpoint.
pub const ENDPOINT_VAR: &str = "S3_ENDPOINT";
/// Environment variable naming the signing region.
pub const REGION_VAR: &str = "AWS_REGION";
/// Environment variable forcing path-style (`true`) or virtual-hosted
/// (`false`) URLs.
pub const PATH_STYLE_VAR: &str = "S3_PATH_STYLE";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Where uploads go and how they are signed.
///
/// Deserializes from any serde format with everything but `bucket`
/// optional, or is read from the environment with [`Config::from_env`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Destination bucket
    pub bucket: String,
    /// Signing region
    #[serde(default = "default_region")]
    pub region: String,
    /// S3-compatible endpoint; the regional AWS endpoint when absent
    #[serde(default)]
    pub endpoint: Option<String>,
    /// URL style override; chosen from the endpoint when absent
    #[serde(default)]
    pub path_style: Option<bool>,
    /// Signer behaviour
    #[serde(default)]
    pub signer: SignerOptions,
}

impl Config {
    /// Configuration for `bucket` on AWS in the default region.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: default_region(),
            endpoint: None,
            path_style: None,
            signer: SignerOptions::default(),
        }
    }

    /// Read `S3_BUCKET`, `S3_ENDPOINT`, `AWS_REGION` and `S3_PATH_STYLE`
    /// from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), resolving variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bucket = var(BUCKET_VAR).ok_or(ConfigError::Missing(BUCKET_VAR))?;
        let region = var(REGION_VAR).unwrap_or_else(default_region);
        let endpoint = var(ENDPOINT_VAR);
        let path_style = var(PATH_STYLE_VAR)
            .map(|value| parse_bool(PATH_STYLE_VAR, value))
            .transpose()?;

        Ok(Self {
            bucket,
            region,
            endpoint,
            path_style,
            signer: SignerOptions::default(),
        })
    }

    /// The service address.
    pub fn address(&self) -> Address {
        match &self.endpoint {
            Some(endpoint) => Address::new(endpoint.clone(), self.region.clone()),
            None => Address::aws(self.region.clone()),
        }
    }

    /// A target for `key` in the configured bucket.
    pub fn target(&self, key: impl Into<String>) -> UploadTarget {
        UploadTarget::new(self.bucket.clone(), key)
    }

    /// An authorizer for the configured address and options.
    pub fn authorizer<P: CredentialsProvider>(
        &self,
        provider: P,
    ) -> Result<RequestAuthorizer<P>, AuthError> {
        let authorizer = RequestAuthorizer::new(self.address(), provider, self.signer)?;
        Ok(match self.path_style {
            Some(path_style) => authorizer.with_path_style(path_style),
            None => authorizer,
        })
    }
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Credentials;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name: &str| vars.get(name).map(|value| value.to_string())
    }

    #[test]
    fn it_requires_a_bucket() {
        assert_eq!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("S3_BUCKET"))
        );
    }

    #[test]
    fn it_defaults_to_aws_in_us_east_1() -> anyhow::Result<()> {
        let config = Config::from_lookup(lookup(&[(BUCKET_VAR, "uploads")]))?;

        assert_eq!(config, Config::new("uploads"));
        assert_eq!(
            config.address(),
            Address::new("https://s3.us-east-1.amazonaws.com", "us-east-1")
        );
        Ok(())
    }

    #[test]
    fn it_reads_endpoint_region_and_path_style() -> anyhow::Result<()> {
        let config = Config::from_lookup(lookup(&[
            (BUCKET_VAR, "uploads"),
            (ENDPOINT_VAR, "https://account.r2.cloudflarestorage.com"),
            (REGION_VAR, "auto"),
            (PATH_STYLE_VAR, "True"),
        ]))?;

        assert_eq!(
            config.address(),
            Address::new("https://account.r2.cloudflarestorage.com", "auto")
        );
        assert_eq!(config.path_style, Some(true));

        let authorizer = config.authorizer(Credentials::new("AKIDEXAMPLE", "secret"))?;
        let authorization = authorizer.authorize(&crate::AuthorizationRequest::new(
            config.target("798798"),
            crate::Hasher::Sha256.checksum(b"poem"),
            4,
        ))?;
        assert_eq!(authorization.url.path(), "/uploads/798798");
        Ok(())
    }

    #[test]
    fn it_rejects_unparseable_path_style() {
        assert_eq!(
            Config::from_lookup(lookup(&[(BUCKET_VAR, "uploads"), (PATH_STYLE_VAR, "maybe")])),
            Err(ConfigError::Invalid {
                name: PATH_STYLE_VAR,
                value: "maybe".into()
            })
        );
    }

    #[test]
    fn it_deserializes_with_defaults() -> anyhow::Result<()> {
        let config: Config = serde_json::from_str(
            r#"{"bucket": "uploads", "endpoint": "http://localhost:9000", "signer": {"disable_header_hoisting": false}}"#,
        )?;

        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.signer.disable_uri_path_escaping);
        assert!(!config.signer.disable_header_hoisting);
        Ok(())
    }
}
