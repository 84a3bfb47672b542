//! Anthropic Messages API provider.
//!
//! The HTTP client is only compiled with the `anthropic` feature. Without
//! it the provider still constructs, but every completion returns
//! [`ProviderError::NotConfigured`], which the pipeline treats like any
//! other stage failure.

use super::{
    factory::ProviderFactory, secrets::ApiCredential, ChatMessage, CompletionConfig,
    CompletionResponse, LlmProvider, ProviderError,
};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[cfg(feature = "anthropic")]
use super::TokenUsage;
#[cfg(feature = "anthropic")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "anthropic")]
use std::time::Duration;

pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    credential: ApiCredential,
    base_url: String,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: DEFAULT_ANTHROPIC_URL.to_string(),
        }
    }

    /// Create from a credential plus JSON options (`base_url`).
    pub fn from_config(credential: ApiCredential, config: &JsonValue) -> Result<Self, ProviderError> {
        if credential.is_empty() {
            return Err(ProviderError::AuthError);
        }

        let base_url = config["base_url"]
            .as_str()
            .unwrap_or(DEFAULT_ANTHROPIC_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            credential,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(feature = "anthropic")]
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
}

#[cfg(feature = "anthropic")]
#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[cfg(feature = "anthropic")]
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlockResponse>,
    model: String,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[cfg(feature = "anthropic")]
#[derive(Debug, Deserialize)]
struct ContentBlockResponse {
    text: Option<String>,
}

#[cfg(feature = "anthropic")]
#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(feature = "anthropic")]
#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[cfg(feature = "anthropic")]
#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    #[cfg(feature = "anthropic")]
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        let mut system = None;
        let mut api_messages = Vec::new();
        for msg in messages {
            if msg.role == "system" {
                system = Some(msg.content);
            } else {
                api_messages.push(AnthropicMessage {
                    role: msg.role,
                    content: msg.content,
                });
            }
        }

        let request = AnthropicRequest {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system,
            messages: api_messages,
            temperature: config.temperature,
        };

        // Only expose the credential here, at the point of use
        let response = client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_body = response
                .json::<AnthropicError>()
                .await
                .map_err(|e| ProviderError::ParseError(e.to_string()))?;

            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: error_body.error.message,
            });
        }

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let content = body
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: body.usage.input_tokens,
                completion_tokens: body.usage.output_tokens,
            },
            model: body.model,
            stop_reason: body.stop_reason,
        })
    }

    #[cfg(not(feature = "anthropic"))]
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::NotConfigured(
            "Anthropic provider requires 'anthropic' feature".to_string(),
        ))
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

/// Factory for Anthropic providers.
///
/// ## Configuration Format
/// ```json
/// { "base_url": "https://..." }
/// ```
pub struct AnthropicProviderFactory;

impl ProviderFactory for AnthropicProviderFactory {
    fn provider_type(&self) -> &'static str {
        "anthropic"
    }

    fn create(
        &self,
        credential: &ApiCredential,
        config: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider = AnthropicProvider::from_config(credential.clone(), config)?;
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Anthropic Claude Messages API"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = AnthropicProvider::new(ApiCredential::anthropic("test-key"));
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url(), DEFAULT_ANTHROPIC_URL);
    }

    #[test]
    fn test_from_config_base_url() {
        let config = serde_json::json!({"base_url": "https://proxy.internal/v1/"});
        let provider =
            AnthropicProvider::from_config(ApiCredential::anthropic("k"), &config).unwrap();
        assert_eq!(provider.base_url(), "https://proxy.internal/v1");
    }

    #[test]
    fn test_from_config_rejects_empty_key() {
        let result = AnthropicProvider::from_config(ApiCredential::anthropic(""), &serde_json::json!({}));
        assert!(matches!(result, Err(ProviderError::AuthError)));
    }

    #[test]
    fn test_factory_validate_invalid_base_url() {
        let factory = AnthropicProviderFactory;
        let config = serde_json::json!({"base_url": "invalid-url"});
        assert!(factory.validate_config(&config).is_err());
        assert!(factory.validate_config(&serde_json::json!({})).is_ok());
    }

    #[test]
    fn test_factory_create() {
        let factory = AnthropicProviderFactory;
        let provider = factory
            .create(&ApiCredential::anthropic("k"), &serde_json::json!({}))
            .unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret_key = "sk-ant-REDACTED";
        let provider = AnthropicProvider::new(ApiCredential::anthropic(secret_key));

        let debug_output = format!("{:?}", provider);
        assert!(
            !debug_output.contains(secret_key),
            "API key was exposed in Debug output!"
        );
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_health_check_reflects_key() {
        let provider = AnthropicProvider::new(ApiCredential::anthropic("k"));
        assert!(provider.health_check().await);

        let empty_provider = AnthropicProvider::new(ApiCredential::anthropic(""));
        assert!(!empty_provider.health_check().await);
    }
}
