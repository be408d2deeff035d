//! Signing credentials and their providers.

use crate::AuthError;

/// Environment variable holding the access key ID.
pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key.
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding an optional session token.
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// AWS credentials for signing requests.
///
/// The secret and session token are redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// AWS Access Key ID
    pub access_key_id: String,
    /// AWS Secret Access Key
    pub secret_access_key: String,
    /// Session token for temporary credentials
    pub session_token: Option<String>,
}

impl Credentials {
    /// Create long-lived credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attach a session token, as issued with temporary credentials.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// A source of signing credentials.
///
/// Providers are read concurrently by every authorization made with them, so
/// resolution must be safe to call from many threads at once.
pub trait CredentialsProvider: Send + Sync {
    /// Resolve the credentials to sign with.
    ///
    /// Fails with [`AuthError::CredentialsUnavailable`] when none can be found.
    fn resolve(&self) -> Result<Credentials, AuthError>;
}

impl CredentialsProvider for Credentials {
    fn resolve(&self) -> Result<Credentials, AuthError> {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(AuthError::CredentialsUnavailable(
                "access key ID and secret access key must not be empty".into(),
            ));
        }
        Ok(self.clone())
    }
}

impl<P: CredentialsProvider + ?Sized> CredentialsProvider for std::sync::Arc<P> {
    fn resolve(&self) -> Result<Credentials, AuthError> {
        (**self).resolve()
    }
}

/// Credentials read from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
/// the optional `AWS_SESSION_TOKEN` each time they are resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentCredentials;

impl EnvironmentCredentials {
    /// Resolve credentials through `lookup` instead of the process environment.
    pub fn resolve_from<F>(lookup: F) -> Result<Credentials, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let access_key_id = var(ACCESS_KEY_ID_VAR).ok_or_else(|| {
            AuthError::CredentialsUnavailable(format!("{} is not set", ACCESS_KEY_ID_VAR))
        })?;
        let secret_access_key = var(SECRET_ACCESS_KEY_VAR).ok_or_else(|| {
            AuthError::CredentialsUnavailable(format!("{} is not set", SECRET_ACCESS_KEY_VAR))
        })?;

        Ok(Credentials {
            access_key_id,
            secret_access_key,
            session_token: var(SESSION_TOKEN_VAR),
        })
    }
}

impl CredentialsProvider for EnvironmentCredentials {
    fn resolve(&self) -> Result<Credentials, AuthError> {
        Self::resolve_from(|name| std::env::var(name).ok())
    }
}
