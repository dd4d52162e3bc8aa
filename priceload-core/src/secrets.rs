//! Credential acquisition.
//!
//! The API token is fetched once per run and passed by reference into fetch
//! tasks. It is never logged or persisted.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("secret '{name}' is not set")]
    Missing { name: String },

    #[error("secret '{name}' is empty")]
    Empty { name: String },
}

/// Upstream API token. Redacted in `Debug` and `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Source of run credentials.
pub trait SecretProvider: Send + Sync {
    fn api_token(&self) -> Result<ApiToken, SecretError>;
}

/// Reads the token from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    var: String,
}

impl EnvSecretProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SecretProvider for EnvSecretProvider {
    fn api_token(&self) -> Result<ApiToken, SecretError> {
        let value = std::env::var(&self.var).map_err(|_| SecretError::Missing {
            name: self.var.clone(),
        })?;
        let value = value.trim();
        if value.is_empty() {
            return Err(SecretError::Empty {
                name: self.var.clone(),
            });
        }
        Ok(ApiToken::new(value))
    }
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticSecretProvider {
    token: ApiToken,
}

impl StaticSecretProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: ApiToken::new(token),
        }
    }
}

impl SecretProvider for StaticSecretProvider {
    fn api_token(&self) -> Result<ApiToken, SecretError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_redacted() {
        let token = ApiToken::new("s3cr3t");
        assert_eq!(format!("{token:?}"), "ApiToken(***)");
        assert_eq!(token.to_string(), "***");
        assert_eq!(token.expose(), "s3cr3t");
    }

    #[test]
    fn missing_env_var() {
        let provider = EnvSecretProvider::new("PRICELOAD_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert_eq!(
            provider.api_token().unwrap_err(),
            SecretError::Missing {
                name: "PRICELOAD_TEST_TOKEN_THAT_IS_NEVER_SET".into()
            }
        );
    }

    #[test]
    fn static_provider_returns_token() {
        let provider = StaticSecretProvider::new("abc");
        assert_eq!(provider.api_token().unwrap().expose(), "abc");
    }
}
