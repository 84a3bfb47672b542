//! In-memory participant roster.
//!
//! Participants are registered with their free-text answers, evaluated
//! later (often in a batch), and then compared as a cohort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::AssessmentResult;

/// Rendered in place of a blank answer.
pub const UNANSWERED: &str = "未記入";

/// Answer sections of the standard registration form, in form order.
pub const INPUT_SECTIONS: [&str; 12] = [
    "管理課題 ①具体的な取り組み",
    "管理課題 ①プロセス・結果",
    "管理課題 ②具体的な取り組み",
    "管理課題 ②プロセス・結果",
    "管理課題 気づき",
    "経営課題 ①危機感・機会感",
    "経営課題 ②危機感・機会感",
    "経営課題 ③危機感・機会感",
    "経営課題 10年先の全社課題",
    "経営宣言 夢・ビジョン",
    "経営宣言 行動と変化",
    "経営宣言 価値観・信念",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("Participant name must not be empty")]
    EmptyName,

    #[error("Participant not found: {0}")]
    NotFound(ParticipantId),
}

/// Roster-assigned participant id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// One registered participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: ParticipantId,
    pub name: String,

    /// (section label, answer) in form order
    pub inputs: Vec<(String, String)>,

    pub evaluation: Option<AssessmentResult>,
    pub registered_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl ParticipantRecord {
    pub fn is_evaluated(&self) -> bool {
        self.evaluation.is_some()
    }

    /// Render the answers as the raw text fed to the pipeline.
    ///
    /// Each section becomes a `### label` heading followed by the trimmed
    /// answer, or [`UNANSWERED`] when blank. Blocks are separated by a
    /// blank line.
    pub fn combined_text(&self) -> String {
        self.inputs
            .iter()
            .map(|(section, value)| {
                let value = value.trim();
                let value = if value.is_empty() { UNANSWERED } else { value };
                format!("### {}\n{}", section, value)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Ordered collection of participants.
#[derive(Debug, Default)]
pub struct Roster {
    records: Vec<ParticipantRecord>,
    next_id: u64,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant and return their id.
    pub fn add(
        &mut self,
        name: &str,
        inputs: Vec<(String, String)>,
    ) -> Result<ParticipantId, RosterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RosterError::EmptyName);
        }

        self.next_id += 1;
        let id = ParticipantId(self.next_id);
        self.records.push(ParticipantRecord {
            id,
            name: name.to_string(),
            inputs,
            evaluation: None,
            registered_at: Utc::now(),
            evaluated_at: None,
        });
        tracing::debug!(participant = %id, "Participant registered");
        Ok(id)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&ParticipantRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// All participants in registration order.
    pub fn list(&self) -> &[ParticipantRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn remove(&mut self, id: ParticipantId) -> Result<ParticipantRecord, RosterError> {
        let position = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(RosterError::NotFound(id))?;
        Ok(self.records.remove(position))
    }

    /// Attach an evaluation, replacing any earlier one.
    pub fn set_evaluation(
        &mut self,
        id: ParticipantId,
        result: AssessmentResult,
    ) -> Result<(), RosterError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RosterError::NotFound(id))?;
        record.evaluation = Some(result);
        record.evaluated_at = Some(Utc::now());
        Ok(())
    }

    /// Ids still awaiting evaluation, in registration order.
    pub fn pending(&self) -> Vec<ParticipantId> {
        self.records
            .iter()
            .filter(|r| !r.is_evaluated())
            .map(|r| r.id)
            .collect()
    }

    pub fn evaluated(&self) -> Vec<&ParticipantRecord> {
        self.records.iter().filter(|r| r.is_evaluated()).collect()
    }
}
