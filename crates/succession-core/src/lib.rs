//! # succession-core
//!
//! Deterministic building blocks for the succession assessment pipeline.
//!
//! This crate holds everything that does not talk to a model:
//! - the eight assessment criteria and the result data model
//! - typed, schema-checked decoding of stage replies
//! - evidence grounding checks
//! - the fallback generator used whenever model output cannot be trusted
//! - acquisition scores, prompt/rubric configuration, the participant
//!   roster and cohort statistics
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No LLM calls**: Model access lives in `succession-runtime`
//! 3. **Grounded fallback**: Every fallback quote is a literal slice of the input
//!
//! ## Example
//!
//! ```rust
//! use succession_core::{check_grounding, dummy};
//!
//! let raw = "営業部で目標管理に課題がある。";
//! let result = dummy::generate(raw);
//!
//! assert!(result.is_dummy());
//! assert!(check_grounding(&result.evidence, raw).is_grounded());
//! assert_eq!(result.scores.acquisition["solution"], 4);
//! ```

pub mod acquisition;
pub mod cohort;
pub mod config;
pub mod criteria;
pub mod dummy;
pub mod evidence;
pub mod grounding;
pub mod roster;
pub mod schema;
pub mod types;

// Re-export main types at crate root
pub use acquisition::{compute_acquisition, compute_with, default_formulas, AcquisitionFormula};
pub use cohort::{CohortStats, ParticipantProfile};
pub use config::{ConfigError, ConfigStore, Flags, PipelineConfig, PromptKey, Prompts};
pub use criteria::{CriterionCode, CriterionGroup, UnknownCriterion};
pub use dummy::DummyGenerator;
pub use evidence::{Evidence, EvidenceIndex, EvidenceResult, Polarity};
pub use grounding::{check_grounding, GroundingError, GroundingReport, GroundingValidator};
pub use roster::{ParticipantId, ParticipantRecord, Roster, RosterError};
pub use schema::{decode_evidence, decode_normalized, decode_scores, DecodeError, ReplyKind};
pub use types::{
    AssessmentMeta, AssessmentResult, Confidence, CriterionScore, NormalizedItem,
    NormalizedResult, ScoreResult, ScoreSheet, Section,
};
