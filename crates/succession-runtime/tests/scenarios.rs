//! End-to-end pipeline scenarios against scripted providers.

use async_trait::async_trait;
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

use succession_core::{check_grounding, CriterionCode, PipelineConfig};
use succession_runtime::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, Pipeline,
    ProviderError, ProviderFactory, RunOutcome, StageMetadata, StageName, StageReporter,
    StageStatus, TokenUsage,
};

const JAPANESE_SENTENCE: &str = "営業部で目標管理に課題がある。";

/// What the scripted backend does for one call.
#[derive(Clone, Debug)]
enum Step {
    Reply(String),
    Fail,
}

struct ScriptedProvider {
    steps: Mutex<Vec<Step>>,
    calls: Mutex<usize>,
}

impl ScriptedProvider {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        *self.calls.lock() += 1;
        let step = {
            let mut steps = self.steps.lock();
            if steps.is_empty() {
                Step::Fail
            } else {
                steps.remove(0)
            }
        };
        match step {
            Step::Reply(content) => Ok(CompletionResponse {
                content,
                usage: TokenUsage::default(),
                model: "scripted".to_string(),
                stop_reason: Some("end_turn".to_string()),
            }),
            Step::Fail => Err(ProviderError::ApiError {
                status: 500,
                message: "overloaded".to_string(),
            }),
        }
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedFactory(Arc<ScriptedProvider>);

impl ProviderFactory for ScriptedFactory {
    fn provider_type(&self) -> &'static str {
        "scripted"
    }

    fn create(
        &self,
        _credential: &ApiCredential,
        _config: &Value,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(self.0.clone())
    }

    fn validate_config(&self, _config: &Value) -> Result<(), ProviderError> {
        Ok(())
    }
}

fn scripted_pipeline(steps: Vec<Step>) -> (Pipeline, Arc<ScriptedProvider>) {
    let provider = ScriptedProvider::new(steps);
    let pipeline = Pipeline::builder()
        .provider_factory(Arc::new(ScriptedFactory(provider.clone())))
        .provider("scripted")
        .build();
    (pipeline, provider)
}

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<(StageName, StageStatus, StageMetadata)>>,
}

impl StageReporter for RecordingReporter {
    fn report(&self, stage: StageName, status: StageStatus, metadata: &StageMetadata) {
        self.events.lock().push((stage, status, metadata.clone()));
    }
}

impl RecordingReporter {
    fn sequence(&self) -> Vec<(StageName, StageStatus)> {
        self.events
            .lock()
            .iter()
            .map(|(stage, status, _)| (*stage, *status))
            .collect()
    }
}

fn key() -> ApiCredential {
    ApiCredential::anthropic("sk-test")
}

fn normalize_reply() -> Step {
    Step::Reply(
        json!({
            "items": [{"docId": "D-1", "section": "dept_issues", "summary": "目標管理の課題", "text": "目標管理に課題がある"}],
            "confidence": "med"
        })
        .to_string(),
    )
}

fn evidence_reply() -> Step {
    Step::Reply(
        json!({"list": [
            {"id": "EV-1", "docId": "D-1", "polarity": "neg", "target": "OL", "quote": "目標管理に課題がある", "note": "課題認識"}
        ]})
        .to_string(),
    )
}

fn score_reply(score: u8) -> Step {
    let entry = json!({"score": score, "reason": "記述に基づく評価", "evidenceIds": ["EV-1"]});
    Step::Reply(format!(
        "採点結果です。\n{}",
        json!({
            "competencies": {"SF": entry, "VCI": entry, "OL": entry, "DE": entry, "LA": entry},
            "readiness": {"CV": entry, "MR": entry, "MN": entry}
        })
    ))
}

#[tokio::test]
async fn scenario_empty_input_returns_none() {
    let (pipeline, provider) = scripted_pipeline(vec![]);
    let reporter = RecordingReporter::default();

    for raw in ["", "   ", "\n\t "] {
        let result = pipeline
            .run(raw, &PipelineConfig::default(), Some(&key()), Some(&reporter))
            .await;
        assert!(result.is_none());
    }

    assert_eq!(provider.calls(), 0);
    assert!(reporter.sequence().is_empty());
}

#[tokio::test]
async fn scenario_dry_run_single_sentence() {
    let (pipeline, provider) = scripted_pipeline(vec![]);
    let reporter = RecordingReporter::default();
    let mut config = PipelineConfig::default();
    config.flags.dry_run = true;

    let result = pipeline
        .run(JAPANESE_SENTENCE, &config, Some(&key()), Some(&reporter))
        .await
        .unwrap();

    assert!(result.is_dummy());
    assert_eq!(result.evidence.len(), 8);
    assert!(result
        .evidence
        .list
        .iter()
        .all(|e| e.quote == "営業部で目標管理に課題がある"));
    for code in CriterionCode::COMPETENCIES {
        assert_eq!(result.scores.result.score_of(code), Some(4));
    }
    for code in CriterionCode::READINESS {
        assert_eq!(result.scores.result.score_of(code), Some(3));
    }
    assert_eq!(result.normalized.items.len(), 1);

    assert_eq!(provider.calls(), 0);
    assert_eq!(
        reporter.sequence(),
        vec![
            (StageName::DryRun, StageStatus::Start),
            (StageName::DryRun, StageStatus::Success),
        ]
    );
}

#[tokio::test]
async fn scenario_missing_credential_behaves_like_dry_run() {
    let (pipeline, provider) = scripted_pipeline(vec![]);

    let report = pipeline
        .run_detailed(JAPANESE_SENTENCE, &PipelineConfig::default(), None, None)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::NoCredential);
    assert!(report.result.is_dummy());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn scenario_all_fives_stub() {
    let (pipeline, provider) =
        scripted_pipeline(vec![normalize_reply(), evidence_reply(), score_reply(5)]);
    let reporter = RecordingReporter::default();

    let result = pipeline
        .run(
            JAPANESE_SENTENCE,
            &PipelineConfig::default(),
            Some(&key()),
            Some(&reporter),
        )
        .await
        .unwrap();

    assert!(!result.is_dummy());
    assert_eq!(result.scores.acquisition["solution"], 5);
    assert_eq!(result.scores.acquisition["achievement"], 5);
    assert_eq!(result.scores.acquisition["management"], 5);
    assert!(result.meta.ungrounded_evidence_ids.is_empty());
    assert!(result.meta.unresolved_evidence_ids.is_empty());
    assert_eq!(provider.calls(), 3);

    assert_eq!(
        reporter.sequence(),
        vec![
            (StageName::Normalize, StageStatus::Start),
            (StageName::Normalize, StageStatus::Success),
            (StageName::Evidence, StageStatus::Start),
            (StageName::Evidence, StageStatus::Success),
            (StageName::Score, StageStatus::Start),
            (StageName::Score, StageStatus::Success),
        ]
    );
    for (_, status, metadata) in reporter.events.lock().iter() {
        if *status != StageStatus::Start {
            assert!(metadata.contains_key("elapsed_ms"));
        }
    }
}

#[tokio::test]
async fn evidence_failure_never_reaches_score_stage() {
    let (pipeline, provider) =
        scripted_pipeline(vec![normalize_reply(), Step::Fail, score_reply(5)]);
    let reporter = RecordingReporter::default();

    let report = pipeline
        .run_detailed(
            JAPANESE_SENTENCE,
            &PipelineConfig::default(),
            Some(&key()),
            Some(&reporter),
        )
        .await
        .unwrap();

    assert!(report.result.is_dummy());
    assert!(matches!(
        report.outcome,
        RunOutcome::Fallback { stage: StageName::Evidence, .. }
    ));
    assert_eq!(provider.calls(), 2);

    let sequence = reporter.sequence();
    assert!(!sequence.iter().any(|(stage, _)| *stage == StageName::Score));
    assert_eq!(
        sequence.last(),
        Some(&(StageName::Evidence, StageStatus::Failure))
    );

    let events = reporter.events.lock();
    let (_, _, failure) = events.last().unwrap();
    assert_eq!(failure["kind"], "backend");
    assert!(failure["error"].as_str().unwrap().contains("overloaded"));
}

#[tokio::test]
async fn incomplete_scores_fall_back_entirely() {
    let partial = Step::Reply(
        json!({
            "competencies": {"SF": {"score": 4, "reason": "r", "evidenceIds": []}},
            "readiness": {}
        })
        .to_string(),
    );
    let (pipeline, _) = scripted_pipeline(vec![normalize_reply(), evidence_reply(), partial]);

    let report = pipeline
        .run_detailed(
            JAPANESE_SENTENCE,
            &PipelineConfig::default(),
            Some(&key()),
            None,
        )
        .await
        .unwrap();

    assert!(report.result.is_dummy());
    assert!(report.result.scores.result.is_complete());
    assert!(matches!(
        report.outcome,
        RunOutcome::Fallback { stage: StageName::Score, .. }
    ));
}

fn failing_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Fail),
        "[^{}]{0,80}".prop_map(Step::Reply),
        Just(Step::Reply("{\"unexpected\": true}".to_string())),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_stage_failure_yields_complete_grounded_fallback(
        failing_stage in 0usize..3,
        failure in failing_step(),
        raw in "[あ-んア-ン一-龥]{1,20}[。！？\n]{1,2}[a-z ]{0,20}",
    ) {
        let mut steps = vec![normalize_reply(), evidence_reply(), score_reply(3)];
        steps[failing_stage] = failure;
        steps.truncate(failing_stage + 1);
        let (pipeline, provider) = scripted_pipeline(steps);

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let report = runtime
            .block_on(pipeline.run_detailed(&raw, &PipelineConfig::default(), Some(&key()), None))
            .unwrap();

        prop_assert!(report.result.is_dummy());
        prop_assert!(report.result.scores.result.is_complete());
        prop_assert_eq!(report.result.evidence.len(), 8);
        prop_assert!(check_grounding(&report.result.evidence, &raw).is_grounded());
        prop_assert_eq!(provider.calls(), failing_stage + 1);
        let is_fallback = matches!(report.outcome, RunOutcome::Fallback { .. });
        prop_assert!(is_fallback);
    }
}
