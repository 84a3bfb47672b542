//! Stage lifecycle reporting.
//!
//! The pipeline calls the reporter synchronously around each stage:
//! `start` before the call, then exactly one of `success` or `failure`.
//! Completion events carry `elapsed_ms`; failures also carry `error` and
//! `kind`. A dry run or a missing credential emits a `dry_run` `start`
//! (with `reason`) followed by a `dry_run` `success` once the fallback
//! output is built.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Stage names as seen by reporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageName {
    Normalize,
    Evidence,
    Score,
    DryRun,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Normalize => "normalize",
            StageName::Evidence => "evidence",
            StageName::Score => "score",
            StageName::DryRun => "dry_run",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageStatus {
    Start,
    Success,
    Failure,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Start => "start",
            StageStatus::Success => "success",
            StageStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form event details.
pub type StageMetadata = BTreeMap<String, Value>;

/// Receives stage lifecycle events.
///
/// Any `Fn(StageName, StageStatus, &StageMetadata)` closure is a reporter.
pub trait StageReporter: Send + Sync {
    fn report(&self, stage: StageName, status: StageStatus, metadata: &StageMetadata);
}

impl<F> StageReporter for F
where
    F: Fn(StageName, StageStatus, &StageMetadata) + Send + Sync,
{
    fn report(&self, stage: StageName, status: StageStatus, metadata: &StageMetadata) {
        self(stage, status, metadata)
    }
}

/// Reporter that writes each event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StageReporter for TracingReporter {
    fn report(&self, stage: StageName, status: StageStatus, metadata: &StageMetadata) {
        let details = Value::Object(metadata.clone().into_iter().collect());
        match status {
            StageStatus::Failure => {
                tracing::warn!(stage = %stage, status = %status, metadata = %details, "Stage event")
            }
            _ => tracing::info!(stage = %stage, status = %status, metadata = %details, "Stage event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_names() {
        assert_eq!(StageName::DryRun.to_string(), "dry_run");
        assert_eq!(StageName::Normalize.as_str(), "normalize");
        assert_eq!(StageStatus::Failure.to_string(), "failure");
    }

    #[test]
    fn test_closure_is_reporter() {
        let events = Mutex::new(Vec::new());
        let reporter = |stage: StageName, status: StageStatus, _: &StageMetadata| {
            events.lock().push((stage, status));
        };

        let dyn_reporter: &dyn StageReporter = &reporter;
        dyn_reporter.report(StageName::Score, StageStatus::Start, &StageMetadata::new());

        assert_eq!(events.lock().as_slice(), &[(StageName::Score, StageStatus::Start)]);
    }

    #[test]
    fn test_tracing_reporter_accepts_metadata() {
        let mut metadata = StageMetadata::new();
        metadata.insert("elapsed_ms".to_string(), Value::from(12u64));
        TracingReporter.report(StageName::Evidence, StageStatus::Success, &metadata);
    }
}
