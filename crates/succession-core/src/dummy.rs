//! Deterministic fallback assessments.
//!
//! Used whenever no model output can be trusted: dry runs, a missing
//! credential, or any failed stage. The output is structurally identical
//! to a real assessment and every quote is a literal slice of the input,
//! so downstream consumers never need a separate code path.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

use crate::acquisition::{compute_with, default_formulas, AcquisitionFormula};
use crate::criteria::CriterionCode;
use crate::evidence::{Evidence, EvidenceResult};
use crate::types::{
    AssessmentMeta, AssessmentResult, Confidence, CriterionScore, NormalizedItem,
    NormalizedResult, ScoreResult, ScoreSheet, Section,
};

/// Fixed score given to every competency.
pub const DUMMY_COMPETENCY_SCORE: u8 = 4;

/// Fixed score given to every readiness criterion.
pub const DUMMY_READINESS_SCORE: u8 = 3;

/// Quote used when the input is empty.
pub const EMPTY_INPUT_PLACEHOLDER: &str = "入力がありません";

const FALLBACK_SENTENCE_CHARS: usize = 80;
const NORMALIZED_TEXT_CHARS: usize = 120;

lazy_static! {
    /// Sentence terminators: Japanese and ASCII full stops, question and
    /// exclamation marks, and line breaks. An ASCII period only ends a
    /// sentence when followed by whitespace or end of input, so decimals
    /// like "3.5" stay intact.
    static ref SENTENCE_BREAK: Regex = Regex::new(r"[。．！？!?\r\n]|\.(?:\s|$)").unwrap();
}

/// Split text into trimmed, non-empty sentences.
///
/// Every returned sentence is a slice of `text`.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Fallback assessment generator.
#[derive(Debug, Clone)]
pub struct DummyGenerator {
    formulas: Vec<AcquisitionFormula>,
}

impl DummyGenerator {
    /// Generator using the standard acquisition formulas.
    pub fn new() -> Self {
        Self {
            formulas: default_formulas(),
        }
    }

    /// Generator using a custom acquisition formula table.
    pub fn with_formulas(formulas: Vec<AcquisitionFormula>) -> Self {
        Self { formulas }
    }

    /// Produce a complete, grounded fallback assessment for `raw_text`.
    pub fn generate(&self, raw_text: &str) -> AssessmentResult {
        let evidence = evidence_for(raw_text);
        let scores = scores_for(&evidence);
        let acquisition = compute_with(&self.formulas, &scores);

        AssessmentResult {
            normalized: normalized_for(raw_text),
            evidence,
            scores: ScoreSheet::new(scores, acquisition),
            meta: AssessmentMeta {
                dummy: true,
                ..Default::default()
            },
        }
    }
}

impl Default for DummyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Produce a fallback assessment with the standard formula table.
pub fn generate(raw_text: &str) -> AssessmentResult {
    DummyGenerator::new().generate(raw_text)
}

fn first_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// One evidence entry per criterion, quoting sentences round-robin.
fn evidence_for(raw_text: &str) -> EvidenceResult {
    let mut sentences = split_sentences(raw_text);
    if sentences.is_empty() {
        let head = first_chars(raw_text, FALLBACK_SENTENCE_CHARS);
        sentences.push(if head.is_empty() {
            EMPTY_INPUT_PLACEHOLDER
        } else {
            head
        });
    }

    let list = CriterionCode::ALL
        .iter()
        .enumerate()
        .map(|(i, code)| {
            Evidence::new(
                format!("EV-{}-{}", code, i + 1),
                *code,
                sentences[i % sentences.len()],
            )
            .with_doc_id("D-1")
        })
        .collect();

    EvidenceResult::new(list)
}

fn scores_for(evidence: &EvidenceResult) -> ScoreResult {
    let mut by_code: BTreeMap<CriterionCode, Vec<String>> = BTreeMap::new();
    for e in &evidence.list {
        by_code.entry(e.target).or_default().push(e.id.clone());
    }

    let mut result = ScoreResult::default();
    for code in CriterionCode::ALL {
        let ids = by_code.remove(&code).unwrap_or_default();
        let reason = format!("{}に関する記述が入力文から確認されました。", code.label());
        if code.is_competency() {
            result
                .competencies
                .insert(code, CriterionScore::new(DUMMY_COMPETENCY_SCORE, reason, ids));
        } else {
            result
                .readiness
                .insert(code, CriterionScore::new(DUMMY_READINESS_SCORE, reason, ids));
        }
    }
    result
}

fn normalized_for(raw_text: &str) -> NormalizedResult {
    NormalizedResult {
        items: vec![NormalizedItem {
            doc_id: "D-1".to_string(),
            section: Section::Summary,
            summary: "入力内容のダミー要約".to_string(),
            text: first_chars(raw_text, NORMALIZED_TEXT_CHARS).to_string(),
        }],
        confidence: Confidence::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grounding::check_grounding;
    use proptest::prelude::*;

    #[test]
    fn test_split_sentences() {
        let text = "営業部で目標管理に課題がある。\n週次で3.5時間の会議を実施した! 次は？";
        assert_eq!(
            split_sentences(text),
            vec!["営業部で目標管理に課題がある", "週次で3.5時間の会議を実施した", "次は"]
        );
    }

    #[test]
    fn test_split_ascii_period() {
        assert_eq!(
            split_sentences("We set goals. Then we reviewed them."),
            vec!["We set goals", "Then we reviewed them"]
        );
    }

    #[test]
    fn test_single_sentence_scenario() {
        let raw = "営業部で目標管理に課題がある。";
        let result = generate(raw);

        assert!(result.is_dummy());
        assert_eq!(result.normalized.items.len(), 1);
        assert_eq!(result.normalized.items[0].text, raw);
        assert_eq!(result.normalized.items[0].section, Section::Summary);
        assert_eq!(result.normalized.confidence, Confidence::Low);
        assert_eq!(result.evidence.len(), 8);
        assert!(result
            .evidence
            .list
            .iter()
            .all(|e| e.quote == "営業部で目標管理に課題がある"));
    }

    #[test]
    fn test_round_robin_quotes() {
        let result = generate("一。二。三");
        let quotes: Vec<&str> = result.evidence.list.iter().map(|e| e.quote.as_str()).collect();
        assert_eq!(quotes, vec!["一", "二", "三", "一", "二", "三", "一", "二"]);
    }

    #[test]
    fn test_ids_and_targets() {
        let result = generate("テスト入力です。");
        let ids: Vec<&str> = result.evidence.list.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["EV-SF-1", "EV-VCI-2", "EV-OL-3", "EV-DE-4", "EV-LA-5", "EV-CV-6", "EV-MR-7", "EV-MN-8"]
        );
        for (e, code) in result.evidence.list.iter().zip(CriterionCode::ALL) {
            assert_eq!(e.target, code);
        }
    }

    #[test]
    fn test_fixed_scores_and_reasons() {
        let result = generate("テスト入力です。");
        let scores = &result.scores.result;
        for code in CriterionCode::COMPETENCIES {
            assert_eq!(scores.score_of(code), Some(DUMMY_COMPETENCY_SCORE));
        }
        for code in CriterionCode::READINESS {
            assert_eq!(scores.score_of(code), Some(DUMMY_READINESS_SCORE));
        }
        let sf = scores.get(CriterionCode::SF).unwrap();
        assert_eq!(sf.reason, "戦略構想力に関する記述が入力文から確認されました。");
        assert_eq!(sf.evidence_ids, vec!["EV-SF-1"]);
    }

    #[test]
    fn test_acquisition_attached() {
        let result = generate("テスト入力です。");
        let acquisition = &result.scores.acquisition;
        assert_eq!(acquisition["solution"], 4);
        assert_eq!(acquisition["achievement"], 4);
        // 0.4*4 + 0.4*4 + 0.2*3 = 3.8
        assert_eq!(acquisition["management"], 4);
    }

    #[test]
    fn test_no_sentences_uses_prefix() {
        let raw = "。。。";
        let result = generate(raw);
        assert!(result.evidence.list.iter().all(|e| e.quote == "。。。"));

        let long = "。".repeat(100);
        let result = generate(&long);
        assert_eq!(result.evidence.list[0].quote.chars().count(), 80);
    }

    #[test]
    fn test_empty_input_placeholder() {
        let result = generate("");
        assert!(result
            .evidence
            .list
            .iter()
            .all(|e| e.quote == EMPTY_INPUT_PLACEHOLDER));
        assert_eq!(result.normalized.items[0].text, "");
    }

    #[test]
    fn test_normalized_text_truncated_by_chars() {
        let raw = "あ".repeat(200);
        let result = generate(&raw);
        assert_eq!(result.normalized.items[0].text.chars().count(), 120);
    }

    proptest! {
        #[test]
        fn prop_dummy_quotes_are_grounded(raw in "\\PC{1,300}") {
            let result = generate(&raw);
            prop_assert!(check_grounding(&result.evidence, &raw).is_grounded());
        }

        #[test]
        fn prop_dummy_covers_every_code_in_order(raw in "[a-zあ-ん。\\n ]{1,120}") {
            let result = generate(&raw);
            prop_assert_eq!(result.evidence.len(), 8);
            for (i, (e, code)) in result.evidence.list.iter().zip(CriterionCode::ALL).enumerate() {
                prop_assert_eq!(e.target, code);
                prop_assert_eq!(&e.id, &format!("EV-{}-{}", code, i + 1));
            }
            prop_assert!(result.scores.result.is_complete());
        }
    }
}
