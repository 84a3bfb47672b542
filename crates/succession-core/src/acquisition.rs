//! Derived "acquisition" scores.
//!
//! Each acquisition score is a weighted blend of criterion scores. Weights
//! are integer percentages, so the weighted sum is computed exactly in
//! hundredths and rounded half up:
//!
//! | name        | formula                      |
//! |-------------|------------------------------|
//! | solution    | 0.40·VCI + 0.30·DE + 0.30·LA |
//! | achievement | 0.50·DE + 0.30·OL + 0.20·LA  |
//! | management  | 0.40·OL + 0.40·SF + 0.20·MR  |
//!
//! A criterion missing from the score result contributes 0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::criteria::CriterionCode;
use crate::types::ScoreResult;

/// One weighted term of a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub code: CriterionCode,

    /// Weight in percent
    pub weight: u32,
}

/// A named weighted blend of criterion scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionFormula {
    pub name: String,
    pub terms: Vec<WeightedTerm>,
}

impl AcquisitionFormula {
    pub fn new(name: impl Into<String>, terms: &[(CriterionCode, u32)]) -> Self {
        Self {
            name: name.into(),
            terms: terms
                .iter()
                .map(|&(code, weight)| WeightedTerm { code, weight })
                .collect(),
        }
    }

    /// Sum of weights in percent. Well-formed formulas total 100.
    pub fn total_weight(&self) -> u32 {
        self.terms.iter().map(|t| t.weight).sum()
    }

    /// Evaluate against a score result, rounding half up.
    pub fn evaluate(&self, scores: &ScoreResult) -> u32 {
        let hundredths: u32 = self
            .terms
            .iter()
            .map(|t| t.weight * u32::from(scores.score_of(t.code).unwrap_or(0)))
            .sum();
        (hundredths + 50) / 100
    }
}

/// The standard formula table.
pub fn default_formulas() -> Vec<AcquisitionFormula> {
    use CriterionCode::*;
    vec![
        AcquisitionFormula::new("solution", &[(VCI, 40), (DE, 30), (LA, 30)]),
        AcquisitionFormula::new("achievement", &[(DE, 50), (OL, 30), (LA, 20)]),
        AcquisitionFormula::new("management", &[(OL, 40), (SF, 40), (MR, 20)]),
    ]
}

/// Compute acquisition scores with the standard formula table.
pub fn compute_acquisition(scores: &ScoreResult) -> BTreeMap<String, u32> {
    compute_with(&default_formulas(), scores)
}

/// Compute acquisition scores with an arbitrary formula table.
pub fn compute_with(formulas: &[AcquisitionFormula], scores: &ScoreResult) -> BTreeMap<String, u32> {
    formulas
        .iter()
        .map(|f| (f.name.clone(), f.evaluate(scores)))
        .collect()
}
