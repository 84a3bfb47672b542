//! Pipeline configuration: prompts, rubric hints, flags and the
//! acquisition formula table.
//!
//! A [`PipelineConfig`] is plain data. It round-trips through YAML so
//! assessors can keep tuned prompts under version control, and every run
//! receives an owned snapshot taken from a [`ConfigStore`].

pub mod defaults;
mod store;

pub use store::ConfigStore;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::acquisition::{default_formulas, AcquisitionFormula};
use crate::criteria::{CriterionCode, UnknownCriterion};

/// Errors from loading, validating or editing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Prompt '{0}' must not be empty")]
    EmptyPrompt(PromptKey),

    #[error("Unknown prompt key: {0}")]
    UnknownPromptKey(String),

    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    #[error(transparent)]
    UnknownCriterion(#[from] UnknownCriterion),

    #[error("Formula '{name}' weights sum to {total}%, expected 100%")]
    InvalidWeights { name: String, total: u32 },

    #[error("Duplicate formula name: {0}")]
    DuplicateFormula(String),
}

/// Identifies one of the three stage prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PromptKey {
    Normalize,
    Evidence,
    Score,
}

impl PromptKey {
    pub const ALL: [PromptKey; 3] = [PromptKey::Normalize, PromptKey::Evidence, PromptKey::Score];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKey::Normalize => "normalize",
            PromptKey::Evidence => "evidence",
            PromptKey::Score => "score",
        }
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "norm" | "normalize" => Ok(PromptKey::Normalize),
            "evidence" => Ok(PromptKey::Evidence),
            "score" => Ok(PromptKey::Score),
            _ => Err(ConfigError::UnknownPromptKey(s.to_string())),
        }
    }
}

/// System prompts for the three stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompts {
    #[serde(alias = "norm")]
    pub normalize: String,
    pub evidence: String,
    pub score: String,
}

impl Prompts {
    pub fn get(&self, key: PromptKey) -> &str {
        match key {
            PromptKey::Normalize => &self.normalize,
            PromptKey::Evidence => &self.evidence,
            PromptKey::Score => &self.score,
        }
    }

    pub fn set(&mut self, key: PromptKey, value: String) {
        match key {
            PromptKey::Normalize => self.normalize = value,
            PromptKey::Evidence => self.evidence = value,
            PromptKey::Score => self.score = value,
        }
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            normalize: defaults::NORMALIZE_PROMPT.to_string(),
            evidence: defaults::EVIDENCE_PROMPT.to_string(),
            score: defaults::SCORE_PROMPT.to_string(),
        }
    }
}

/// Behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    /// Skip all model calls and return fallback output
    #[serde(default)]
    pub dry_run: bool,

    /// Treat any ungrounded quote as an evidence-stage failure
    #[serde(default)]
    pub strict_grounding: bool,
}

impl Flags {
    pub const NAMES: [&'static str; 2] = ["dry_run", "strict_grounding"];

    /// Set a flag by name.
    pub fn set(&mut self, name: &str, value: bool) -> Result<(), ConfigError> {
        match name {
            "dry_run" => self.dry_run = value,
            "strict_grounding" => self.strict_grounding = value,
            other => return Err(ConfigError::UnknownFlag(other.to_string())),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        match name {
            "dry_run" => Some(self.dry_run),
            "strict_grounding" => Some(self.strict_grounding),
            _ => None,
        }
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub prompts: Prompts,

    /// Rubric hint per criterion, passed to the score stage
    #[serde(default = "defaults::default_rubrics")]
    pub rubrics: BTreeMap<CriterionCode, String>,

    #[serde(default)]
    pub flags: Flags,

    /// Acquisition formula table
    #[serde(default = "default_formulas")]
    pub acquisition: Vec<AcquisitionFormula>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prompts: Prompts::default(),
            rubrics: defaults::default_rubrics(),
            flags: Flags::default(),
            acquisition: default_formulas(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a configuration from YAML. Omitted sections
    /// take their default values.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Check prompts are non-empty and every formula is well formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in PromptKey::ALL {
            if self.prompts.get(key).trim().is_empty() {
                return Err(ConfigError::EmptyPrompt(key));
            }
        }

        let mut names = BTreeSet::new();
        for formula in &self.acquisition {
            if !names.insert(formula.name.as_str()) {
                return Err(ConfigError::DuplicateFormula(formula.name.clone()));
            }
            let total = formula.total_weight();
            if total != 100 {
                return Err(ConfigError::InvalidWeights {
                    name: formula.name.clone(),
                    total,
                });
            }
        }

        Ok(())
    }

    /// Rubric hints as `CODE: text` lines in canonical order.
    pub fn rubrics_text(&self) -> String {
        self.rubrics
            .iter()
            .map(|(code, text)| format!("{}: {}", code, text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
