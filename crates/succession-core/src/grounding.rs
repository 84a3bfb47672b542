//! Evidence grounding: every quote must be a verbatim slice of the input.
//!
//! The model is asked to copy quotes out of `ORIGINAL_TEXT`, but nothing
//! forces it to. This validator checks the property independently of any
//! model call so that tests and monitoring can assert it directly.
//!
//! Comparison is exact. Whitespace-normalized matching is used only to
//! classify a failure as [`GroundingError::WhitespaceDrift`], which is
//! still a violation.

use thiserror::Error;

use crate::evidence::{Evidence, EvidenceResult};

/// Why a quote failed grounding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroundingError {
    #[error("Evidence {id} has an empty quote")]
    EmptyQuote { id: String },

    #[error("Evidence {id} quote is not in the original text: '{quote}'")]
    NotVerbatim { id: String, quote: String },

    #[error("Evidence {id} quote only matches after whitespace normalization: '{quote}'")]
    WhitespaceDrift { id: String, quote: String },
}

impl GroundingError {
    /// Id of the offending evidence.
    pub fn evidence_id(&self) -> &str {
        match self {
            GroundingError::EmptyQuote { id }
            | GroundingError::NotVerbatim { id, .. }
            | GroundingError::WhitespaceDrift { id, .. } => id,
        }
    }
}

/// Checks evidence quotes against the original input text.
pub struct GroundingValidator<'a> {
    original: &'a str,
    normalized_original: String,
}

impl<'a> GroundingValidator<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            normalized_original: normalize_whitespace(original),
        }
    }

    /// Validate a single evidence item.
    pub fn validate(&self, evidence: &Evidence) -> Result<(), GroundingError> {
        if evidence.quote.is_empty() {
            return Err(GroundingError::EmptyQuote {
                id: evidence.id.clone(),
            });
        }

        if self.original.contains(evidence.quote.as_str()) {
            return Ok(());
        }

        let normalized_quote = normalize_whitespace(&evidence.quote);
        if !normalized_quote.is_empty() && self.normalized_original.contains(&normalized_quote) {
            return Err(GroundingError::WhitespaceDrift {
                id: evidence.id.clone(),
                quote: evidence.quote.clone(),
            });
        }

        Err(GroundingError::NotVerbatim {
            id: evidence.id.clone(),
            quote: evidence.quote.clone(),
        })
    }

    /// Validate all evidence, stopping at the first violation.
    pub fn validate_all(&self, evidence: &[Evidence]) -> Result<(), GroundingError> {
        for e in evidence {
            self.validate(e)?;
        }
        Ok(())
    }

    /// Collect every violation instead of stopping at the first.
    pub fn violations(&self, evidence: &[Evidence]) -> Vec<GroundingError> {
        evidence
            .iter()
            .filter_map(|e| self.validate(e).err())
            .collect()
    }
}

/// Outcome of checking a whole evidence result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundingReport {
    pub checked: usize,
    pub violations: Vec<GroundingError>,
}

impl GroundingReport {
    pub fn is_grounded(&self) -> bool {
        self.violations.is_empty()
    }

    /// Ids of ungrounded evidence, in extraction order.
    pub fn ungrounded_ids(&self) -> Vec<String> {
        self.violations
            .iter()
            .map(|v| v.evidence_id().to_string())
            .collect()
    }
}

/// Check that every quote in `evidence` is an exact substring of `raw_text`.
pub fn check_grounding(evidence: &EvidenceResult, raw_text: &str) -> GroundingReport {
    let validator = GroundingValidator::new(raw_text);
    let violations = validator.violations(&evidence.list);
    for violation in &violations {
        tracing::debug!(evidence_id = violation.evidence_id(), error = %violation, "Ungrounded evidence");
    }
    GroundingReport {
        checked: evidence.len(),
        violations,
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::CriterionCode;

    const ORIGINAL: &str = "営業部で目標管理に課題がある。\n週次の   振り返り会を始めた。";

    fn make_evidence(id: &str, quote: &str) -> Evidence {
        Evidence::new(id, CriterionCode::DE, quote)
    }

    #[test]
    fn test_exact_substring_passes() {
        let validator = GroundingValidator::new(ORIGINAL);
        assert!(validator
            .validate(&make_evidence("EV-1", "目標管理に課題がある"))
            .is_ok());
    }

    #[test]
    fn test_paraphrase_fails() {
        let validator = GroundingValidator::new(ORIGINAL);
        let result = validator.validate(&make_evidence("EV-1", "目標管理が課題である"));
        assert!(matches!(result, Err(GroundingError::NotVerbatim { .. })));
    }

    #[test]
    fn test_whitespace_drift_is_still_a_violation() {
        let validator = GroundingValidator::new(ORIGINAL);
        let result = validator.validate(&make_evidence("EV-2", "週次の 振り返り会を始めた"));
        assert!(matches!(result, Err(GroundingError::WhitespaceDrift { .. })));
    }

    #[test]
    fn test_empty_quote_fails() {
        let validator = GroundingValidator::new(ORIGINAL);
        let result = validator.validate(&make_evidence("EV-3", ""));
        assert_eq!(
            result,
            Err(GroundingError::EmptyQuote {
                id: "EV-3".to_string()
            })
        );
    }

    #[test]
    fn test_validate_all_stops_at_first() {
        let validator = GroundingValidator::new(ORIGINAL);
        let evidence = vec![
            make_evidence("EV-1", "営業部で"),
            make_evidence("EV-2", "存在しない文"),
            make_evidence("EV-3", "別の捏造"),
        ];
        let err = validator.validate_all(&evidence).unwrap_err();
        assert_eq!(err.evidence_id(), "EV-2");
    }

    #[test]
    fn test_report_lists_all_ungrounded_ids() {
        let result = EvidenceResult::new(vec![
            make_evidence("EV-1", "営業部で"),
            make_evidence("EV-2", "存在しない文"),
            make_evidence("EV-3", "別の捏造"),
        ]);
        let report = check_grounding(&result, ORIGINAL);
        assert_eq!(report.checked, 3);
        assert!(!report.is_grounded());
        assert_eq!(report.ungrounded_ids(), vec!["EV-2", "EV-3"]);
    }

    #[test]
    fn test_empty_result_is_grounded() {
        let report = check_grounding(&EvidenceResult::default(), ORIGINAL);
        assert!(report.is_grounded());
        assert_eq!(report.checked, 0);
    }
}
