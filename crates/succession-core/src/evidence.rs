//! Evidence quoted from a participant's input.
//!
//! Every score must be traceable to evidence, and every piece of evidence
//! must quote the original input verbatim. Quoting is checked by
//! [`crate::grounding`]; this module holds the types and the id lookup
//! used to connect scores back to their quotes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use crate::criteria::CriterionCode;
use crate::types::{CriterionScore, ScoreResult};

/// Advisory length range for a quote, in characters.
pub const QUOTE_LENGTH: RangeInclusive<usize> = 30..=200;

/// Whether the evidence supports or undermines its target criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Pos,
    Neg,
    #[default]
    Neutral,
}

/// A verbatim excerpt tagged with the criterion it speaks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Unique within one run (e.g. "EV-3")
    pub id: String,

    #[serde(default)]
    pub doc_id: String,

    #[serde(default)]
    pub polarity: Polarity,

    pub target: CriterionCode,

    /// Exact substring of the original input
    pub quote: String,

    #[serde(default)]
    pub note: String,
}

impl Evidence {
    /// Create neutral evidence with no document id or note.
    pub fn new(id: impl Into<String>, target: CriterionCode, quote: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            doc_id: String::new(),
            polarity: Polarity::Neutral,
            target,
            quote: quote.into(),
            note: String::new(),
        }
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = doc_id.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Whether the quote length falls in the advisory range.
    pub fn quote_in_range(&self) -> bool {
        QUOTE_LENGTH.contains(&self.quote.chars().count())
    }
}

/// Output of the evidence stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvidenceResult {
    pub list: Vec<Evidence>,
}

impl EvidenceResult {
    pub fn new(list: Vec<Evidence>) -> Self {
        Self { list }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Build the id lookup for this run.
    pub fn index(&self) -> EvidenceIndex<'_> {
        EvidenceIndex::new(&self.list)
    }

    /// Ids that appear more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = Vec::new();
        for evidence in &self.list {
            if !seen.insert(evidence.id.as_str()) && !duplicates.contains(&evidence.id) {
                duplicates.push(evidence.id.clone());
            }
        }
        duplicates
    }
}

/// Id-keyed lookup over one run's evidence.
///
/// When ids collide the first entry wins.
#[derive(Debug, Clone)]
pub struct EvidenceIndex<'a> {
    list: &'a [Evidence],
    by_id: BTreeMap<&'a str, &'a Evidence>,
}

impl<'a> EvidenceIndex<'a> {
    pub fn new(list: &'a [Evidence]) -> Self {
        let mut by_id = BTreeMap::new();
        for evidence in list {
            by_id.entry(evidence.id.as_str()).or_insert(evidence);
        }
        Self { list, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&'a Evidence> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// All entries targeting a criterion, in extraction order.
    pub fn by_target(&self, code: CriterionCode) -> Vec<&'a Evidence> {
        self.list.iter().filter(|e| e.target == code).collect()
    }

    /// Resolve the evidence a score cites.
    ///
    /// Falls back to the first three entries targeting `code` when none of
    /// the cited ids resolve.
    pub fn supporting(&self, code: CriterionCode, score: &CriterionScore) -> Vec<&'a Evidence> {
        let cited: Vec<&'a Evidence> = score
            .evidence_ids
            .iter()
            .filter_map(|id| self.get(id))
            .collect();
        if !cited.is_empty() {
            return cited;
        }
        self.by_target(code).into_iter().take(3).collect()
    }

    /// Ids cited by `scores` that no evidence entry carries, deduplicated
    /// in first-cited order.
    pub fn unresolved_ids(&self, scores: &ScoreResult) -> Vec<String> {
        let mut unresolved: Vec<String> = Vec::new();
        for (_, score) in scores.iter() {
            for id in &score.evidence_ids {
                if !self.contains(id) && !unresolved.contains(id) {
                    unresolved.push(id.clone());
                }
            }
        }
        unresolved
    }
}
