//! Secure credential handling for model providers.
//!
//! The pipeline takes its credential as an explicit argument instead of
//! reading ambient state, so the only place an environment variable is
//! consulted is [`ApiCredential::from_env`], called by the host.
//!
//! - **No accidental logging**: credentials never appear in Debug/Display output
//! - **Memory safety**: values are zeroed on drop via `secrecy`
//! - **Explicit exposure**: the raw value is only reachable through [`ApiCredential::expose`]

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

/// Environment variable holding the Anthropic API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from configuration
    Config,
    /// Loaded from environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely stored API credential.
///
/// An empty credential is a valid value; the pipeline treats it the same
/// as no credential at all.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Wrap a programmatically supplied Anthropic API key.
    pub fn anthropic(value: impl Into<String>) -> Self {
        Self::new(value, CredentialSource::Programmatic, "Anthropic API key")
    }

    /// Load a credential from an environment variable.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ProviderError> {
        std::env::var(env_var)
            .map(|v| Self::new(v, CredentialSource::Environment, name))
            .map_err(|_| {
                ProviderError::NotConfigured(format!(
                    "{} not set: configure '{}' environment variable",
                    name, env_var
                ))
            })
    }

    /// Load a credential from the environment, treating an unset or blank
    /// variable as absent.
    pub fn from_env_optional(env_var: &str, name: &'static str) -> Option<Self> {
        Self::from_env(env_var, name)
            .ok()
            .filter(|cred| !cred.expose().trim().is_empty())
    }

    /// Expose the raw value. Call only at the point of use.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().trim().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Clone for ApiCredential {
    fn clone(&self) -> Self {
        Self::new(self.expose(), self.source, self.name)
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "Test API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Test API key");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("[REDACTED]"));
        assert!(display.contains("Test API key"));
        assert!(display.contains("config"));
    }

    #[test]
    fn test_credential_expose_and_clone() {
        let cred = ApiCredential::anthropic("sk-key");
        let copy = cred.clone();
        assert_eq!(copy.expose(), "sk-key");
        assert_eq!(copy.source(), CredentialSource::Programmatic);
        assert_eq!(copy.name(), "Anthropic API key");
    }

    #[test]
    fn test_blank_credential_is_empty() {
        assert!(ApiCredential::anthropic("").is_empty());
        assert!(ApiCredential::anthropic("   ").is_empty());
        assert!(!ApiCredential::anthropic("k").is_empty());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("SUCCESSION_TEST_KEY_PRESENT", "env-key");
        let cred = ApiCredential::from_env("SUCCESSION_TEST_KEY_PRESENT", "Test key").unwrap();
        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), CredentialSource::Environment);
        std::env::remove_var("SUCCESSION_TEST_KEY_PRESENT");
    }

    #[test]
    fn test_from_env_missing() {
        let err = ApiCredential::from_env("SUCCESSION_TEST_KEY_MISSING_12345", "Test key")
            .unwrap_err();
        assert!(err.to_string().contains("Test key"));
        assert!(err.to_string().contains("SUCCESSION_TEST_KEY_MISSING_12345"));
    }

    #[test]
    fn test_from_env_optional_treats_blank_as_absent() {
        std::env::set_var("SUCCESSION_TEST_KEY_BLANK", "  ");
        assert!(ApiCredential::from_env_optional("SUCCESSION_TEST_KEY_BLANK", "Test key").is_none());
        std::env::remove_var("SUCCESSION_TEST_KEY_BLANK");

        assert!(
            ApiCredential::from_env_optional("SUCCESSION_TEST_KEY_UNSET_12345", "Test key")
                .is_none()
        );
    }
}
