//! The fixed assessment criteria.
//!
//! Eight criteria split into two groups: five competencies and three
//! readiness dimensions. The set is closed and its order is part of the
//! output contract (fallback evidence ids, rubric text, report ordering).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string does not name a criterion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown criterion code: {0}")]
pub struct UnknownCriterion(pub String);

/// Which group a criterion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionGroup {
    /// Leadership capability dimensions
    Competency,
    /// Leadership readiness dimensions
    Readiness,
}

/// One of the eight assessment criteria.
///
/// Declaration order is the canonical order, so `Ord` and `BTreeMap`
/// iteration follow SF, VCI, OL, DE, LA, CV, MR, MN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CriterionCode {
    SF,
    VCI,
    OL,
    DE,
    LA,
    CV,
    MR,
    MN,
}

impl CriterionCode {
    /// All criteria in canonical order.
    pub const ALL: [CriterionCode; 8] = [
        CriterionCode::SF,
        CriterionCode::VCI,
        CriterionCode::OL,
        CriterionCode::DE,
        CriterionCode::LA,
        CriterionCode::CV,
        CriterionCode::MR,
        CriterionCode::MN,
    ];

    /// Competency criteria in canonical order.
    pub const COMPETENCIES: [CriterionCode; 5] = [
        CriterionCode::SF,
        CriterionCode::VCI,
        CriterionCode::OL,
        CriterionCode::DE,
        CriterionCode::LA,
    ];

    /// Readiness criteria in canonical order.
    pub const READINESS: [CriterionCode; 3] =
        [CriterionCode::CV, CriterionCode::MR, CriterionCode::MN];

    /// The short code, e.g. `"VCI"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionCode::SF => "SF",
            CriterionCode::VCI => "VCI",
            CriterionCode::OL => "OL",
            CriterionCode::DE => "DE",
            CriterionCode::LA => "LA",
            CriterionCode::CV => "CV",
            CriterionCode::MR => "MR",
            CriterionCode::MN => "MN",
        }
    }

    /// Display label shown to assessors.
    pub fn label(&self) -> &'static str {
        match self {
            CriterionCode::SF => "戦略構想力",
            CriterionCode::VCI => "価値創出・イノベーション力",
            CriterionCode::OL => "人的資源・組織運営力",
            CriterionCode::DE => "意思決定・実行力",
            CriterionCode::LA => "学習・適応力",
            CriterionCode::CV => "キャリアビジョン",
            CriterionCode::MR => "使命感・責任感",
            CriterionCode::MN => "体制・ネットワーク",
        }
    }

    pub fn group(&self) -> CriterionGroup {
        match self {
            CriterionCode::SF
            | CriterionCode::VCI
            | CriterionCode::OL
            | CriterionCode::DE
            | CriterionCode::LA => CriterionGroup::Competency,
            CriterionCode::CV | CriterionCode::MR | CriterionCode::MN => {
                CriterionGroup::Readiness
            }
        }
    }

    pub fn is_competency(&self) -> bool {
        self.group() == CriterionGroup::Competency
    }

    /// Position in canonical order (0-based).
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for CriterionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CriterionCode {
    type Err = UnknownCriterion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        CriterionCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == upper)
            .ok_or_else(|| UnknownCriterion(s.to_string()))
    }
}
