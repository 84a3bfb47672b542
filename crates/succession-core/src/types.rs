//! Data types produced by the assessment pipeline.
//!
//! Every type here serializes to the JSON shape the stage prompts ask the
//! model for (camelCase field names such as `docId` and `evidenceIds`), so
//! a stage reply decodes straight into these types and a finished result
//! can be exported as-is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::criteria::CriterionCode;
use crate::evidence::{EvidenceIndex, EvidenceResult};

/// Advisory length range for a score reason, in characters.
pub const REASON_LENGTH: RangeInclusive<usize> = 100..=180;

/// Maximum length of a normalized item summary, in characters.
pub const SUMMARY_MAX_CHARS: usize = 120;

/// Section a normalized excerpt was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "dept_status")]
    DeptStatus,
    #[serde(rename = "dept_issues")]
    DeptIssues,
    #[serde(rename = "solutions")]
    Solutions,
    #[serde(rename = "vision")]
    Vision,
    #[serde(rename = "training_reflection")]
    TrainingReflection,
    #[serde(rename = "next1to2y")]
    Next1To2Years,
    /// Synthetic section used only by fallback output.
    #[serde(rename = "summary")]
    Summary,
}

/// Confidence the normalizer reports for its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Med,
    High,
}

/// One classified excerpt of the raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    #[serde(default)]
    pub doc_id: String,

    pub section: Section,

    #[serde(default)]
    pub summary: String,

    /// Verbatim excerpt of the input
    pub text: String,
}

/// Output of the normalize stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    pub items: Vec<NormalizedItem>,
    pub confidence: Confidence,
}

/// Score for a single criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionScore {
    /// Integer score, 1 to 5
    pub score: u8,

    #[serde(default)]
    pub reason: String,

    /// Ids of evidence produced in the same run
    #[serde(default)]
    pub evidence_ids: Vec<String>,
}

impl CriterionScore {
    pub fn new(score: u8, reason: impl Into<String>, evidence_ids: Vec<String>) -> Self {
        Self {
            score,
            reason: reason.into(),
            evidence_ids,
        }
    }

    /// Whether the reason length falls in the advisory range.
    pub fn reason_in_range(&self) -> bool {
        REASON_LENGTH.contains(&self.reason.chars().count())
    }
}

/// Output of the score stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreResult {
    pub competencies: BTreeMap<CriterionCode, CriterionScore>,
    pub readiness: BTreeMap<CriterionCode, CriterionScore>,
}

impl ScoreResult {
    /// Look up a criterion in whichever group it belongs to.
    pub fn get(&self, code: CriterionCode) -> Option<&CriterionScore> {
        if code.is_competency() {
            self.competencies.get(&code)
        } else {
            self.readiness.get(&code)
        }
    }

    /// The numeric score for a criterion, if present.
    pub fn score_of(&self, code: CriterionCode) -> Option<u8> {
        self.get(code).map(|s| s.score)
    }

    /// All present scores in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (CriterionCode, &CriterionScore)> {
        CriterionCode::ALL
            .into_iter()
            .filter_map(move |code| self.get(code).map(|s| (code, s)))
    }

    /// Criteria with no score, in canonical order.
    pub fn missing(&self) -> Vec<CriterionCode> {
        CriterionCode::ALL
            .into_iter()
            .filter(|code| self.get(*code).is_none())
            .collect()
    }

    /// True when all five competencies and all three readiness criteria are scored.
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Scores as attached to a finished assessment: the stage scores plus
/// the derived acquisition composites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSheet {
    #[serde(flatten)]
    pub result: ScoreResult,

    #[serde(default)]
    pub acquisition: BTreeMap<String, u32>,
}

impl ScoreSheet {
    pub fn new(result: ScoreResult, acquisition: BTreeMap<String, u32>) -> Self {
        Self {
            result,
            acquisition,
        }
    }

    pub fn competencies(&self) -> &BTreeMap<CriterionCode, CriterionScore> {
        &self.result.competencies
    }

    pub fn readiness(&self) -> &BTreeMap<CriterionCode, CriterionScore> {
        &self.result.readiness
    }
}

/// Metadata describing how a result was produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AssessmentMeta {
    /// True when the result came from the fallback generator
    pub dummy: bool,

    /// Evidence whose quote is not a verbatim substring of the input
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ungrounded_evidence_ids: Vec<String>,

    /// Ids cited by scores that no evidence entry carries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_evidence_ids: Vec<String>,
}

/// The complete output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub normalized: NormalizedResult,
    pub evidence: EvidenceResult,
    pub scores: ScoreSheet,
    pub meta: AssessmentMeta,
}

impl AssessmentResult {
    pub fn is_dummy(&self) -> bool {
        self.meta.dummy
    }

    /// Id-keyed view over this result's evidence.
    pub fn evidence_index(&self) -> EvidenceIndex<'_> {
        self.evidence.index()
    }
}
