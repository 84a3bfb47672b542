//! Per-participant profiles and cohort-wide statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::criteria::CriterionCode;
use crate::roster::ParticipantRecord;
use crate::types::ScoreResult;

/// Round `total / count` to two decimals, half up, using integer math.
fn average_2dp(total: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let hundredths = (total * 200 + count) / (2 * count);
    hundredths as f64 / 100.0
}

fn group_average(scores: &ScoreResult, codes: &[CriterionCode]) -> f64 {
    let values: Vec<u64> = codes
        .iter()
        .filter_map(|code| scores.score_of(*code))
        .map(u64::from)
        .collect();
    average_2dp(values.iter().sum(), values.len() as u64)
}

/// Summary view of one participant's scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    pub competency_average: f64,
    pub readiness_average: f64,

    /// Highest-scoring criterion, first in canonical order on ties
    pub strongest: Option<CriterionCode>,

    /// Lowest-scoring criterion, first in canonical order on ties
    pub growth_area: Option<CriterionCode>,
}

impl ParticipantProfile {
    pub fn from_scores(scores: &ScoreResult) -> Self {
        let mut strongest: Option<(CriterionCode, u8)> = None;
        let mut growth_area: Option<(CriterionCode, u8)> = None;
        for (code, score) in scores.iter() {
            if strongest.map_or(true, |(_, best)| score.score > best) {
                strongest = Some((code, score.score));
            }
            if growth_area.map_or(true, |(_, worst)| score.score < worst) {
                growth_area = Some((code, score.score));
            }
        }

        Self {
            competency_average: group_average(scores, &CriterionCode::COMPETENCIES),
            readiness_average: group_average(scores, &CriterionCode::READINESS),
            strongest: strongest.map(|(code, _)| code),
            growth_area: growth_area.map(|(code, _)| code),
        }
    }

    /// Mean of the two group averages.
    pub fn overall_average(&self) -> f64 {
        (self.competency_average + self.readiness_average) / 2.0
    }
}

/// Averages across every evaluated participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortStats {
    /// Per-criterion average, rounded to two decimals
    pub averages: BTreeMap<CriterionCode, f64>,
    pub evaluated_count: usize,
}

impl CohortStats {
    /// Compute from roster records. `None` when nobody has been evaluated.
    pub fn compute<'a>(records: impl IntoIterator<Item = &'a ParticipantRecord>) -> Option<Self> {
        Self::from_scores(
            records
                .into_iter()
                .filter_map(|r| r.evaluation.as_ref())
                .map(|e| &e.scores.result),
        )
    }

    /// Compute from bare score results. `None` for an empty input.
    pub fn from_scores<'a>(scores: impl IntoIterator<Item = &'a ScoreResult>) -> Option<Self> {
        let mut totals: BTreeMap<CriterionCode, u64> = BTreeMap::new();
        let mut count = 0usize;
        for result in scores {
            count += 1;
            for code in CriterionCode::ALL {
                *totals.entry(code).or_default() += u64::from(result.score_of(code).unwrap_or(0));
            }
        }
        if count == 0 {
            return None;
        }

        let averages = totals
            .into_iter()
            .map(|(code, total)| (code, average_2dp(total, count as u64)))
            .collect();
        Some(Self {
            averages,
            evaluated_count: count,
        })
    }

    pub fn average(&self, code: CriterionCode) -> f64 {
        self.averages.get(&code).copied().unwrap_or(0.0)
    }

    fn extremes(&self, codes: &[CriterionCode]) -> (Vec<CriterionCode>, Vec<CriterionCode>) {
        let values: Vec<f64> = codes.iter().map(|c| self.average(*c)).collect();
        let max = values.iter().copied().fold(f64::MIN, f64::max);
        let min = values.iter().copied().fold(f64::MAX, f64::min);
        let top = codes.iter().copied().filter(|c| self.average(*c) == max).collect();
        let bottom = codes.iter().copied().filter(|c| self.average(*c) == min).collect();
        (top, bottom)
    }

    /// Japanese narrative naming the cohort's strongest and weakest criteria.
    /// Tied criteria are all listed.
    pub fn summary(&self) -> String {
        fn labels(codes: &[CriterionCode]) -> String {
            codes.iter().map(|c| c.label()).collect::<Vec<_>>().join(", ")
        }

        let (top_comp, bottom_comp) = self.extremes(&CriterionCode::COMPETENCIES);
        let (top_ready, bottom_ready) = self.extremes(&CriterionCode::READINESS);

        [
            format!(
                "全{}名の平均スコアで最も高かったのは {} です。",
                self.evaluated_count,
                labels(&top_comp)
            ),
            format!("一方、伸びしろが大きいのは {} でした。", labels(&bottom_comp)),
            format!(
                "経営者準備度では {} が相対的に高く、 {} が課題として浮かび上がっています。",
                labels(&top_ready),
                labels(&bottom_ready)
            ),
        ]
        .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy;
    use crate::roster::Roster;
    use crate::types::CriterionScore;

    fn scores(values: [u8; 8]) -> ScoreResult {
        let mut result = ScoreResult::default();
        for (code, value) in CriterionCode::ALL.into_iter().zip(values) {
            let score = CriterionScore::new(value, "", vec![]);
            if code.is_competency() {
                result.competencies.insert(code, score);
            } else {
                result.readiness.insert(code, score);
            }
        }
        result
    }

    #[test]
    fn test_average_rounding() {
        assert_eq!(average_2dp(10, 3), 3.33);
        assert_eq!(average_2dp(5, 3), 1.67);
        assert_eq!(average_2dp(0, 0), 0.0);
    }

    #[test]
    fn test_profile() {
        //                     SF VCI OL DE LA CV MR MN
        let profile = ParticipantProfile::from_scores(&scores([3, 5, 2, 5, 4, 3, 4, 2]));
        assert_eq!(profile.competency_average, 3.8);
        assert_eq!(profile.readiness_average, 3.0);
        assert_eq!(profile.strongest, Some(CriterionCode::VCI));
        assert_eq!(profile.growth_area, Some(CriterionCode::OL));
        assert!((profile.overall_average() - 3.4).abs() < 1e-9);
    }

    #[test]
    fn test_profile_of_empty_scores() {
        let profile = ParticipantProfile::from_scores(&ScoreResult::default());
        assert_eq!(profile.strongest, None);
        assert_eq!(profile.competency_average, 0.0);
    }

    #[test]
    fn test_cohort_none_when_unevaluated() {
        let mut roster = Roster::new();
        roster.add("A", vec![]).unwrap();
        assert!(CohortStats::compute(roster.list()).is_none());
    }

    #[test]
    fn test_cohort_from_roster() {
        let mut roster = Roster::new();
        let a = roster.add("A", vec![]).unwrap();
        roster.add("B", vec![]).unwrap();
        roster.set_evaluation(a, dummy::generate("テスト。")).unwrap();

        let stats = CohortStats::compute(roster.list()).unwrap();
        assert_eq!(stats.evaluated_count, 1);
        assert_eq!(stats.average(CriterionCode::SF), 4.0);
        assert_eq!(stats.average(CriterionCode::MN), 3.0);
    }

    #[test]
    fn test_summary_lists_ties() {
        let a = scores([5, 5, 1, 3, 3, 4, 2, 2]);
        let b = scores([4, 4, 2, 3, 3, 4, 2, 3]);
        let stats = CohortStats::from_scores([&a, &b]).unwrap();
        assert_eq!(stats.average(CriterionCode::SF), 4.5);
        assert_eq!(stats.average(CriterionCode::MN), 2.5);

        assert_eq!(
            stats.summary(),
            "全2名の平均スコアで最も高かったのは 戦略構想力, 価値創出・イノベーション力 です。 \
             一方、伸びしろが大きいのは 人的資源・組織運営力 でした。 \
             経営者準備度では キャリアビジョン が相対的に高く、 使命感・責任感 が課題として浮かび上がっています。"
        );
    }
}
