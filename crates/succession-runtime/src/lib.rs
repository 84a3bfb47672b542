//! # succession-runtime
//!
//! Model-backed execution of the succession assessment pipeline.
//!
//! `succession-core` holds the deterministic pieces; this crate adds the
//! model calls around them: the provider abstraction, the single-call
//! stage caller with JSON recovery, lifecycle reporting, and the
//! [`Pipeline`] that sequences normalize, evidence and score.
//!
//! ## Example
//!
//! ```rust,ignore
//! use succession_core::PipelineConfig;
//! use succession_runtime::{ApiCredential, Pipeline, RuntimeConfig, TracingReporter};
//!
//! let pipeline = Pipeline::new(RuntimeConfig::from_env()?);
//! let credential = ApiCredential::from_env_optional("ANTHROPIC_API_KEY", "Anthropic API key");
//!
//! let result = pipeline
//!     .run(&raw_text, &PipelineConfig::default(), credential.as_ref(), Some(&TracingReporter))
//!     .await;
//! ```

pub mod config;
pub mod orchestrator;
pub mod providers;
pub mod reporter;
pub mod stage;

pub use config::{RuntimeConfig, RuntimeConfigError};
pub use orchestrator::{Pipeline, PipelineBuilder, RunOutcome, RunReport};
pub use providers::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, CredentialSource,
    LlmProvider, ProviderError, ProviderFactory, ProviderRegistry, TokenUsage,
    ANTHROPIC_API_KEY_ENV,
};
pub use reporter::{StageMetadata, StageName, StageReporter, StageStatus, TracingReporter};
pub use stage::{extract_json_object, StageCaller, StageFailure, StageReply};
