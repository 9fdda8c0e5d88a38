//! API credential passed into the completion client

use crate::error::{QaError, Result};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Bearer token for the completion endpoint
#[derive(Clone)]
pub struct ApiCredential {
    key: SecretString,
}

impl ApiCredential {
    /// Wrap a key; blank keys are rejected
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(QaError::Configuration("API key is empty".to_string()));
        }
        Ok(Self {
            key: SecretString::new(key),
        })
    }

    /// Read the key from an environment variable
    pub fn from_env(var: &str) -> Result<Self> {
        let key = std::env::var(var)
            .map_err(|_| QaError::Configuration(format!("{} is not set", var)))?;
        Self::new(key)
    }

    pub(crate) fn bearer(&self) -> &str {
        self.key.expose_secret()
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_rejected() {
        assert!(matches!(
            ApiCredential::new("  "),
            Err(QaError::Configuration(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let credential = ApiCredential::new("sk-secret").unwrap();
        assert_eq!(credential.bearer(), "sk-secret");
        assert!(!format!("{:?}", credential).contains("sk-secret"));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("DOCQA_TEST_CREDENTIAL_KEY", "test-key");
        let credential = ApiCredential::from_env("DOCQA_TEST_CREDENTIAL_KEY").unwrap();
        assert_eq!(credential.bearer(), "test-key");
        std::env::remove_var("DOCQA_TEST_CREDENTIAL_KEY");

        assert!(ApiCredential::from_env("DOCQA_TEST_CREDENTIAL_MISSING").is_err());
    }
}
