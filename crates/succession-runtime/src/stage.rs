//! One model round trip: prompt in, JSON object out.
//!
//! A stage call never panics and never retries. Backend errors, timeouts
//! and replies with no recoverable JSON object all come back as a
//! [`StageFailure`] value for the orchestrator to act on.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use succession_core::DecodeError;

use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError, TokenUsage};

/// Appended to every stage instruction.
const JSON_ONLY_SUFFIX: &str = "Please respond with valid JSON only.";

const PREVIEW_CHARS: usize = 200;

/// Why a stage produced no usable output.
#[derive(Error, Debug)]
pub enum StageFailure {
    #[error("Backend error: {0}")]
    Backend(#[from] ProviderError),

    #[error("Stage timed out after {0:?}")]
    Timeout(Duration),

    #[error("Reply contained no JSON object: '{preview}'")]
    Malformed { preview: String },

    #[error("Reply did not match the expected shape: {0}")]
    Invalid(#[from] DecodeError),

    #[error("Evidence quotes not found in the input: {}", .ids.join(", "))]
    Ungrounded { ids: Vec<String> },
}

impl StageFailure {
    /// Short machine-readable kind, used in reporter metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            StageFailure::Backend(_) => "backend",
            StageFailure::Timeout(_) => "timeout",
            StageFailure::Malformed { .. } => "malformed",
            StageFailure::Invalid(_) => "invalid",
            StageFailure::Ungrounded { .. } => "ungrounded",
        }
    }
}

/// A successfully parsed stage reply.
#[derive(Debug, Clone)]
pub struct StageReply {
    pub value: Value,
    pub usage: TokenUsage,
}

/// Combine system prompt and user content into the single instruction
/// sent to the backend.
pub fn build_instruction(system_prompt: &str, user_content: &str) -> String {
    format!(
        "System: {}\n\nUser: {}\n\n{}",
        system_prompt, user_content, JSON_ONLY_SUFFIX
    )
}

/// Pull a JSON object out of a model reply.
///
/// The whole reply is tried first. Otherwise the span from the first `{`
/// to its matching `}` is parsed. Braces inside JSON strings are counted
/// like any other brace, so a reply whose prose precedes an object that
/// contains unbalanced braces in a string may not be recovered.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(map);
    }

    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return match serde_json::from_str::<Value>(&text[start..end]) {
                        Ok(Value::Object(map)) => Some(map),
                        _ => None,
                    };
                }
            }
            _ => {}
        }
    }
    None
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Issues stage calls against one provider.
#[derive(Clone)]
pub struct StageCaller {
    provider: Arc<dyn LlmProvider>,
    completion: CompletionConfig,
    timeout: Option<Duration>,
}

impl StageCaller {
    pub fn new(provider: Arc<dyn LlmProvider>, completion: CompletionConfig) -> Self {
        Self {
            provider,
            completion,
            timeout: None,
        }
    }

    /// Bound each call; exceeding the bound is a [`StageFailure::Timeout`].
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send one instruction and parse the reply into a JSON object.
    pub async fn call(&self, system_prompt: &str, user_content: &str) -> Result<StageReply, StageFailure> {
        let instruction = build_instruction(system_prompt, user_content);
        tracing::debug!(
            provider = self.provider.name(),
            instruction_chars = instruction.chars().count(),
            "Sending stage request"
        );

        let request = self
            .provider
            .complete(vec![ChatMessage::user(instruction)], &self.completion);

        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| StageFailure::Timeout(limit))??,
            None => request.await?,
        };

        tracing::debug!(
            reply_chars = response.content.chars().count(),
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Received stage reply"
        );

        match extract_json_object(&response.content) {
            Some(map) => Ok(StageReply {
                value: Value::Object(map),
                usage: response.usage,
            }),
            None => Err(StageFailure::Malformed {
                preview: preview(&response.content),
            }),
        }
    }
}

impl std::fmt::Debug for StageCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageCaller")
            .field("provider", &self.provider.name())
            .field("model", &self.completion.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
