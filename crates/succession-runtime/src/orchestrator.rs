//! Three-stage assessment pipeline.
//!
//! Stages run strictly in sequence, each feeding the next:
//! 1. **normalize**: classify the raw input into sections
//! 2. **evidence**: extract verbatim quotes tagged with a criterion
//! 3. **score**: score all eight criteria against the evidence
//!
//! Any stage failure stops the run and the whole result is replaced by
//! fallback output. A result is never a mix of model and fallback parts.
//! Nothing escapes [`Pipeline::run`] as an error; degradation is visible
//! through `meta.dummy`, reporter `failure` events, and the
//! [`RunOutcome`] returned by [`Pipeline::run_detailed`].

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use succession_core::{
    check_grounding, compute_with, decode_evidence, decode_normalized, decode_scores,
    AssessmentMeta, AssessmentResult, DummyGenerator, EvidenceResult, NormalizedResult,
    PipelineConfig, PromptKey, ScoreResult, ScoreSheet,
};

use crate::config::RuntimeConfig;
use crate::providers::{ApiCredential, ProviderFactory, ProviderRegistry, TokenUsage};
use crate::reporter::{StageMetadata, StageName, StageReporter, StageStatus};
use crate::stage::{StageCaller, StageFailure};

/// How a run arrived at its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// All three stages succeeded
    Real,
    /// The `dry_run` flag was set
    DryRun,
    /// No usable credential was supplied
    NoCredential,
    /// A stage failed and fallback output was returned
    Fallback { stage: StageName, reason: String },
}

impl RunOutcome {
    pub fn is_real(&self) -> bool {
        matches!(self, RunOutcome::Real)
    }
}

/// A result together with how it was produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: AssessmentResult,
    pub outcome: RunOutcome,

    /// Tokens spent across all stage calls
    pub usage: TokenUsage,
}

/// Runs assessments against a registered provider.
#[derive(Debug)]
pub struct Pipeline {
    registry: ProviderRegistry,
    runtime: RuntimeConfig,
}

impl Pipeline {
    /// Pipeline over the built-in providers.
    pub fn new(runtime: RuntimeConfig) -> Self {
        Self {
            registry: ProviderRegistry::with_defaults(),
            runtime,
        }
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    /// Assess `raw_text`.
    ///
    /// Returns `None` only when the input is empty or whitespace. Every
    /// other path, including every failure, yields a complete result.
    pub async fn run(
        &self,
        raw_text: &str,
        config: &PipelineConfig,
        credential: Option<&ApiCredential>,
        reporter: Option<&dyn StageReporter>,
    ) -> Option<AssessmentResult> {
        self.run_detailed(raw_text, config, credential, reporter)
            .await
            .map(|report| report.result)
    }

    /// Like [`run`](Self::run), but also reports how the result was produced.
    pub async fn run_detailed(
        &self,
        raw_text: &str,
        config: &PipelineConfig,
        credential: Option<&ApiCredential>,
        reporter: Option<&dyn StageReporter>,
    ) -> Option<RunReport> {
        if raw_text.trim().is_empty() {
            tracing::debug!("Empty input, nothing to assess");
            return None;
        }

        let fallback = DummyGenerator::with_formulas(config.acquisition.clone());

        let credential = match (config.flags.dry_run, credential.filter(|c| !c.is_empty())) {
            (false, Some(credential)) => credential,
            (dry_run, _) => {
                let (outcome, reason) = if dry_run {
                    (RunOutcome::DryRun, "dry_run")
                } else {
                    (RunOutcome::NoCredential, "no_credential")
                };
                tracing::info!(reason, "Skipping model stages");
                let mut metadata = StageMetadata::new();
                metadata.insert("reason".to_string(), Value::from(reason));
                emit(reporter, StageName::DryRun, StageStatus::Start, &metadata);

                let started = Instant::now();
                let result = fallback.generate(raw_text);
                let mut done = StageMetadata::new();
                done.insert(
                    "elapsed_ms".to_string(),
                    Value::from(started.elapsed().as_millis() as u64),
                );
                emit(reporter, StageName::DryRun, StageStatus::Success, &done);

                return Some(RunReport {
                    result,
                    outcome,
                    usage: TokenUsage::default(),
                });
            }
        };

        let mut run = StageRun {
            reporter,
            usage: TokenUsage::default(),
        };
        let result = self.run_stages(&mut run, raw_text, config, credential).await;

        match result {
            Ok(result) => {
                tracing::info!(total_tokens = run.usage.total(), "Assessment complete");
                Some(RunReport {
                    result,
                    outcome: RunOutcome::Real,
                    usage: run.usage,
                })
            }
            Err((stage, failure)) => {
                tracing::warn!(stage = %stage, error = %failure, "Stage failed, returning fallback output");
                Some(RunReport {
                    result: fallback.generate(raw_text),
                    outcome: RunOutcome::Fallback {
                        stage,
                        reason: failure.to_string(),
                    },
                    usage: run.usage,
                })
            }
        }
    }

    async fn run_stages(
        &self,
        run: &mut StageRun<'_>,
        raw_text: &str,
        config: &PipelineConfig,
        credential: &ApiCredential,
    ) -> Result<AssessmentResult, (StageName, StageFailure)> {
        let caller = match self.registry.create(
            &self.runtime.provider,
            credential,
            &self.runtime.provider_options(),
        ) {
            Ok(provider) => StageCaller::new(provider, self.runtime.completion_config())
                .with_timeout(self.runtime.stage_timeout),
            Err(e) => {
                let failure = StageFailure::from(e);
                emit(run.reporter, StageName::Normalize, StageStatus::Start, &StageMetadata::new());
                emit(
                    run.reporter,
                    StageName::Normalize,
                    StageStatus::Failure,
                    &failure_metadata(&failure, 0),
                );
                return Err((StageName::Normalize, failure));
            }
        };

        // Stage 1
        let input = serde_json::json!({ "input": { "text": raw_text } });
        let (normalized, normalized_json): (NormalizedResult, String) = run
            .stage(
                &caller,
                StageName::Normalize,
                config.prompts.get(PromptKey::Normalize),
                &format!("入力データ(JSON):\n{}", input),
                |value| Ok(decode_normalized(value)?),
            )
            .await?;

        // Stage 2
        let strict = config.flags.strict_grounding;
        let (evidence, evidence_json): (EvidenceResult, String) = run
            .stage(
                &caller,
                StageName::Evidence,
                config.prompts.get(PromptKey::Evidence),
                &format!(
                    "正規化入力:\n{}\n---\nORIGINAL_TEXT:\n{}",
                    normalized_json, raw_text
                ),
                |value| {
                    let evidence = decode_evidence(value)?;
                    if strict {
                        let report = check_grounding(&evidence, raw_text);
                        if !report.is_grounded() {
                            return Err(StageFailure::Ungrounded {
                                ids: report.ungrounded_ids(),
                            });
                        }
                    }
                    Ok(evidence)
                },
            )
            .await?;

        // Stage 3
        let (scores, _): (ScoreResult, String) = run
            .stage(
                &caller,
                StageName::Score,
                config.prompts.get(PromptKey::Score),
                &format!(
                    "正規化入力:\n{}\n---\nエビデンス:\n{}\n---\nRUBRICS:\n{}",
                    normalized_json,
                    evidence_json,
                    config.rubrics_text()
                ),
                |value| Ok(decode_scores(value)?),
            )
            .await?;

        let ungrounded_evidence_ids = check_grounding(&evidence, raw_text).ungrounded_ids();
        if !ungrounded_evidence_ids.is_empty() {
            tracing::warn!(ids = ?ungrounded_evidence_ids, "Evidence quotes not found verbatim in input");
        }
        let off_length: Vec<&str> = evidence
            .list
            .iter()
            .filter(|e| !e.quote_in_range())
            .map(|e| e.id.as_str())
            .collect();
        if !off_length.is_empty() {
            tracing::debug!(ids = ?off_length, "Evidence quotes outside the advisory length");
        }
        let unresolved_evidence_ids = evidence.index().unresolved_ids(&scores);
        if !unresolved_evidence_ids.is_empty() {
            tracing::warn!(ids = ?unresolved_evidence_ids, "Scores cite unknown evidence ids");
        }

        let acquisition = compute_with(&config.acquisition, &scores);
        Ok(AssessmentResult {
            normalized,
            evidence,
            scores: ScoreSheet::new(scores, acquisition),
            meta: AssessmentMeta {
                dummy: false,
                ungrounded_evidence_ids,
                unresolved_evidence_ids,
            },
        })
    }
}

/// Per-run state threaded through the stages.
struct StageRun<'a> {
    reporter: Option<&'a dyn StageReporter>,
    usage: TokenUsage,
}

impl StageRun<'_> {
    /// Call one stage, decode its reply, and report around it.
    ///
    /// Returns the decoded value plus the reply re-serialized as compact
    /// JSON for the next stage's input.
    async fn stage<T>(
        &mut self,
        caller: &StageCaller,
        stage: StageName,
        system_prompt: &str,
        user_content: &str,
        decode: impl FnOnce(&Value) -> Result<T, StageFailure>,
    ) -> Result<(T, String), (StageName, StageFailure)> {
        let mut start = StageMetadata::new();
        start.insert("provider".to_string(), Value::from(caller.provider_name()));
        start.insert(
            "input_chars".to_string(),
            Value::from(user_content.chars().count()),
        );
        emit(self.reporter, stage, StageStatus::Start, &start);

        let started = Instant::now();
        let outcome = match caller.call(system_prompt, user_content).await {
            Ok(reply) => {
                self.usage.prompt_tokens += reply.usage.prompt_tokens;
                self.usage.completion_tokens += reply.usage.completion_tokens;
                decode(&reply.value).map(|decoded| (decoded, reply))
            }
            Err(failure) => Err(failure),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((decoded, reply)) => {
                tracing::info!(stage = %stage, elapsed_ms, "Stage succeeded");
                let mut metadata = StageMetadata::new();
                metadata.insert("elapsed_ms".to_string(), Value::from(elapsed_ms));
                metadata.insert(
                    "prompt_tokens".to_string(),
                    Value::from(reply.usage.prompt_tokens),
                );
                metadata.insert(
                    "completion_tokens".to_string(),
                    Value::from(reply.usage.completion_tokens),
                );
                emit(self.reporter, stage, StageStatus::Success, &metadata);
                Ok((decoded, reply.value.to_string()))
            }
            Err(failure) => {
                tracing::warn!(stage = %stage, elapsed_ms, kind = failure.kind(), error = %failure, "Stage failed");
                emit(
                    self.reporter,
                    stage,
                    StageStatus::Failure,
                    &failure_metadata(&failure, elapsed_ms),
                );
                Err((stage, failure))
            }
        }
    }
}

fn failure_metadata(failure: &StageFailure, elapsed_ms: u64) -> StageMetadata {
    let mut metadata = StageMetadata::new();
    metadata.insert("elapsed_ms".to_string(), Value::from(elapsed_ms));
    metadata.insert("kind".to_string(), Value::from(failure.kind()));
    metadata.insert("error".to_string(), Value::from(failure.to_string()));
    metadata
}

fn emit(
    reporter: Option<&dyn StageReporter>,
    stage: StageName,
    status: StageStatus,
    metadata: &StageMetadata,
) {
    if let Some(reporter) = reporter {
        reporter.report(stage, status, metadata);
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    registry: ProviderRegistry,
    runtime: RuntimeConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::with_defaults(),
            runtime: RuntimeConfig::default(),
        }
    }

    /// Replace the provider registry entirely.
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register an extra provider factory.
    pub fn provider_factory(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        self.registry.register(factory);
        self
    }

    pub fn runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Select the registered provider type to use.
    pub fn provider(mut self, provider_type: impl Into<String>) -> Self {
        self.runtime.provider = provider_type.into();
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            registry: self.registry,
            runtime: self.runtime,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
