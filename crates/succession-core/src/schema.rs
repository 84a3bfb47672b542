//! Typed decoding of stage replies.
//!
//! A reply is first validated against the stage's embedded JSON Schema,
//! then deserialized. Anything that parses as JSON but has the wrong shape
//! (a missing criterion, a score outside 1 to 5, an unknown section) is a
//! [`DecodeError`], never a partially filled value.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::evidence::EvidenceResult;
use crate::types::{NormalizedResult, ScoreResult};

const NORMALIZE_SCHEMA_JSON: &str = include_str!("../schemas/normalize.schema.json");
const EVIDENCE_SCHEMA_JSON: &str = include_str!("../schemas/evidence.schema.json");
const SCORE_SCHEMA_JSON: &str = include_str!("../schemas/score.schema.json");

type CompiledSchema = OnceLock<Result<jsonschema::Validator, String>>;

static NORMALIZE_SCHEMA: CompiledSchema = OnceLock::new();
static EVIDENCE_SCHEMA: CompiledSchema = OnceLock::new();
static SCORE_SCHEMA: CompiledSchema = OnceLock::new();

/// The stage whose reply is being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    Normalize,
    Evidence,
    Score,
}

impl ReplyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyKind::Normalize => "normalize",
            ReplyKind::Evidence => "evidence",
            ReplyKind::Score => "score",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            ReplyKind::Normalize => NORMALIZE_SCHEMA_JSON,
            ReplyKind::Evidence => EVIDENCE_SCHEMA_JSON,
            ReplyKind::Score => SCORE_SCHEMA_JSON,
        }
    }

    fn cell(&self) -> &'static CompiledSchema {
        match self {
            ReplyKind::Normalize => &NORMALIZE_SCHEMA,
            ReplyKind::Evidence => &EVIDENCE_SCHEMA,
            ReplyKind::Score => &SCORE_SCHEMA,
        }
    }
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from decoding a stage reply.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to load {kind} schema: {message}")]
    SchemaLoad { kind: ReplyKind, message: String },

    #[error("{kind} reply failed schema validation: {}", .errors.join("; "))]
    Invalid { kind: ReplyKind, errors: Vec<String> },

    #[error("{kind} reply has an unexpected shape: {source}")]
    Shape {
        kind: ReplyKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate evidence id: {0}")]
    DuplicateEvidenceId(String),
}

fn get_validator(kind: ReplyKind) -> Result<&'static jsonschema::Validator, DecodeError> {
    let result = kind.cell().get_or_init(|| {
        let schema_value: Value = match serde_json::from_str(kind.source()) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(message) => Err(DecodeError::SchemaLoad {
            kind,
            message: message.clone(),
        }),
    }
}

/// Validate a reply against its stage schema, collecting every error.
pub fn validate_reply(kind: ReplyKind, value: &Value) -> Result<(), DecodeError> {
    let validator = get_validator(kind)?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::Invalid { kind, errors })
    }
}

fn decode<T: DeserializeOwned>(kind: ReplyKind, value: &Value) -> Result<T, DecodeError> {
    validate_reply(kind, value)?;
    T::deserialize(value).map_err(|source| DecodeError::Shape { kind, source })
}

pub fn decode_normalized(value: &Value) -> Result<NormalizedResult, DecodeError> {
    decode(ReplyKind::Normalize, value)
}

/// Decode an evidence reply. Ids must be unique within the reply.
pub fn decode_evidence(value: &Value) -> Result<EvidenceResult, DecodeError> {
    let result: EvidenceResult = decode(ReplyKind::Evidence, value)?;
    if let Some(id) = result.duplicate_ids().into_iter().next() {
        return Err(DecodeError::DuplicateEvidenceId(id));
    }
    Ok(result)
}

/// Decode a score reply. All eight criteria must be present.
pub fn decode_scores(value: &Value) -> Result<ScoreResult, DecodeError> {
    decode(ReplyKind::Score, value)
}
