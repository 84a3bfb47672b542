//! Shared, editable configuration.

use parking_lot::RwLock;

use super::{ConfigError, Flags, PipelineConfig, PromptKey};
use crate::criteria::CriterionCode;

/// Holds the live configuration that assessors edit between runs.
///
/// Runs never read the store directly; they take a [`snapshot`] so an
/// edit made mid-run cannot change the prompts a run is using.
///
/// [`snapshot`]: ConfigStore::snapshot
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: RwLock<PipelineConfig>,
}

impl ConfigStore {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    /// Owned copy of the current configuration.
    pub fn snapshot(&self) -> PipelineConfig {
        self.inner.read().clone()
    }

    pub fn get_prompt(&self, key: PromptKey) -> String {
        self.inner.read().prompts.get(key).to_string()
    }

    /// Replace a stage prompt. Empty prompts are rejected.
    pub fn set_prompt(&self, key: PromptKey, value: impl Into<String>) -> Result<(), ConfigError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyPrompt(key));
        }
        self.inner.write().prompts.set(key, value);
        tracing::debug!(prompt = %key, "Prompt updated");
        Ok(())
    }

    pub fn get_rubric(&self, code: CriterionCode) -> Option<String> {
        self.inner.read().rubrics.get(&code).cloned()
    }

    pub fn set_rubric(&self, code: CriterionCode, text: impl Into<String>) {
        self.inner.write().rubrics.insert(code, text.into());
        tracing::debug!(criterion = %code, "Rubric updated");
    }

    pub fn get_flags(&self) -> Flags {
        self.inner.read().flags
    }

    pub fn set_flag(&self, name: &str, value: bool) -> Result<(), ConfigError> {
        self.inner.write().flags.set(name, value)
    }

    pub fn rubrics_text(&self) -> String {
        self.inner.read().rubrics_text()
    }

    /// Swap in a whole configuration after validating it.
    pub fn replace(&self, config: PipelineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.inner.write() = config;
        Ok(())
    }

    /// Restore the shipped defaults.
    pub fn reset(&self) {
        *self.inner.write() = PipelineConfig::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults;

    #[test]
    fn test_prompt_edit() {
        let store = ConfigStore::default();
        assert_eq!(store.get_prompt(PromptKey::Normalize), defaults::NORMALIZE_PROMPT);

        store.set_prompt(PromptKey::Score, "新しい採点指示").unwrap();
        assert_eq!(store.get_prompt(PromptKey::Score), "新しい採点指示");
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let store = ConfigStore::default();
        let result = store.set_prompt(PromptKey::Evidence, "  ");
        assert!(matches!(result, Err(ConfigError::EmptyPrompt(PromptKey::Evidence))));
        assert_eq!(store.get_prompt(PromptKey::Evidence), defaults::EVIDENCE_PROMPT);
    }

    #[test]
    fn test_rubric_edit_shows_in_text() {
        let store = ConfigStore::default();
        store.set_rubric(CriterionCode::MN, "社外ネットワーク");
        assert_eq!(store.get_rubric(CriterionCode::MN).as_deref(), Some("社外ネットワーク"));
        assert!(store.rubrics_text().ends_with("MN: 社外ネットワーク"));
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let store = ConfigStore::default();
        let snapshot = store.snapshot();
        store.set_flag("dry_run", true).unwrap();
        assert!(!snapshot.flags.dry_run);
        assert!(store.get_flags().dry_run);
    }

    #[test]
    fn test_replace_validates() {
        let store = ConfigStore::default();
        let mut bad = PipelineConfig::default();
        bad.acquisition[0].terms[0].weight = 10;
        assert!(store.replace(bad).is_err());
        assert_eq!(store.snapshot(), PipelineConfig::default());
    }

    #[test]
    fn test_reset() {
        let store = ConfigStore::default();
        store.set_flag("strict_grounding", true).unwrap();
        store.set_rubric(CriterionCode::SF, "x");
        store.reset();
        assert_eq!(store.snapshot(), PipelineConfig::default());
    }
}
