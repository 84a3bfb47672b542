//! Runtime settings: which backend, which model, and how long a stage may take.

use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

use crate::providers::{CompletionConfig, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};

pub const MODEL_ENV: &str = "SUCCESSION_MODEL";
pub const MAX_TOKENS_ENV: &str = "SUCCESSION_MAX_TOKENS";
pub const STAGE_TIMEOUT_ENV: &str = "SUCCESSION_STAGE_TIMEOUT";
pub const BASE_URL_ENV: &str = "SUCCESSION_BASE_URL";

/// Errors from reading runtime settings.
#[derive(Error, Debug)]
pub enum RuntimeConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} is not a valid duration: {source}")]
    InvalidDuration {
        var: &'static str,
        #[source]
        source: humantime::DurationError,
    },
}

/// Settings shared by every stage call of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Registered provider type, e.g. "anthropic"
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,

    /// Override for the provider endpoint
    pub base_url: Option<String>,

    /// Upper bound on one stage call; exceeding it is a stage failure
    pub stage_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            base_url: None,
            stage_timeout: None,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `SUCCESSION_*` environment variables.
    pub fn from_env() -> Result<Self, RuntimeConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RuntimeConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(model) = get(MODEL_ENV) {
            config.model = model.trim().to_string();
        }

        if let Some(value) = get(MAX_TOKENS_ENV) {
            config.max_tokens = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(RuntimeConfigError::InvalidNumber {
                    var: MAX_TOKENS_ENV,
                    value,
                })?;
        }

        if let Some(value) = get(STAGE_TIMEOUT_ENV) {
            let timeout = humantime::parse_duration(value.trim()).map_err(|source| {
                RuntimeConfigError::InvalidDuration {
                    var: STAGE_TIMEOUT_ENV,
                    source,
                }
            })?;
            config.stage_timeout = Some(timeout);
        }

        if let Some(url) = get(BASE_URL_ENV) {
            config.base_url = Some(url.trim().to_string());
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    /// Per-request settings handed to the provider.
    pub fn completion_config(&self) -> CompletionConfig {
        let mut config = CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..Default::default()
        };
        if let Some(timeout) = self.stage_timeout {
            config.timeout = timeout;
        }
        config
    }

    /// Options passed to the provider factory.
    pub fn provider_options(&self) -> JsonValue {
        match &self.base_url {
            Some(url) => serde_json::json!({ "base_url": url }),
            None => serde_json::json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.max_tokens, 4000);
        assert!(config.stage_timeout.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            (MODEL_ENV, "claude-test"),
            (MAX_TOKENS_ENV, "2048"),
            (STAGE_TIMEOUT_ENV, "1m 30s"),
            (BASE_URL_ENV, "http://localhost:8080/v1"),
        ]))
        .unwrap();
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.stage_timeout, Some(Duration::from_secs(90)));
        assert_eq!(
            config.provider_options()["base_url"],
            "http://localhost:8080/v1"
        );
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = RuntimeConfig::from_lookup(lookup(&[(MODEL_ENV, "  ")])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            RuntimeConfig::from_lookup(lookup(&[(MAX_TOKENS_ENV, "lots")])),
            Err(RuntimeConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_lookup(lookup(&[(MAX_TOKENS_ENV, "0")])),
            Err(RuntimeConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_lookup(lookup(&[(STAGE_TIMEOUT_ENV, "soon")])),
            Err(RuntimeConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_completion_config_uses_stage_timeout() {
        let config = RuntimeConfig::default().with_stage_timeout(Duration::from_secs(5));
        let completion = config.completion_config();
        assert_eq!(completion.timeout, Duration::from_secs(5));
        assert_eq!(completion.max_tokens, 4000);
    }
}
