//! The validator seam.
//!
//! Validators are the pluggable checks a phase executor runs: linters, test
//! harnesses, security scanners, LLM critics. They inspect a run snapshot
//! and report findings; they never mutate state themselves.

use async_trait::async_trait;
use prp_core::PrpState;

/// What one validator found.
#[derive(Debug, Clone)]
pub struct ValidatorVerdict {
    /// Overall judgement. Findings below still decide the phase gate; this
    /// flag only matters when a validator fails without naming a finding.
    pub passed: bool,

    /// Fatal findings.
    pub blockers: Vec<String>,

    /// Tolerated findings.
    pub majors: Vec<String>,

    /// Raw output preserved as evidence content.
    pub details: serde_json::Value,
}

impl ValidatorVerdict {
    /// A clean pass with no findings.
    pub fn pass() -> Self {
        Self {
            passed: true,
            blockers: Vec::new(),
            majors: Vec::new(),
            details: serde_json::Value::Null,
        }
    }

    /// A verdict carrying findings; passes iff there are none.
    pub fn with_findings(blockers: Vec<String>, majors: Vec<String>) -> Self {
        Self {
            passed: blockers.is_empty() && majors.is_empty(),
            blockers,
            majors,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// A pluggable check run by a phase executor.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Stable name, used as the evidence source and in findings.
    fn name(&self) -> &str;

    /// Inspect the snapshot and report. An `Err` is an execution failure
    /// (tool crashed, timed out); the executor converts it into a blocker
    /// rather than aborting the phase.
    async fn validate(&self, state: &PrpState) -> anyhow::Result<ValidatorVerdict>;
}

/// A validator with a canned verdict. Useful for wiring tests and for
/// representing externally-computed results.
pub struct FixedValidator {
    name: String,
    verdict: ValidatorVerdict,
}

impl FixedValidator {
    pub fn new(name: impl Into<String>, verdict: ValidatorVerdict) -> Self {
        Self {
            name: name.into(),
            verdict,
        }
    }

    pub fn passing(name: impl Into<String>) -> Self {
        Self::new(name, ValidatorVerdict::pass())
    }

    pub fn blocking(name: impl Into<String>, blocker: impl Into<String>) -> Self {
        Self::new(
            name,
            ValidatorVerdict::with_findings(vec![blocker.into()], vec![]),
        )
    }

    pub fn with_major(name: impl Into<String>, major: impl Into<String>) -> Self {
        Self::new(
            name,
            ValidatorVerdict::with_findings(vec![], vec![major.into()]),
        )
    }
}

#[async_trait]
impl Validator for FixedValidator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate(&self, _state: &PrpState) -> anyhow::Result<ValidatorVerdict> {
        Ok(self.verdict.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_pass_is_clean() {
        let v = ValidatorVerdict::pass();
        assert!(v.passed);
        assert!(v.blockers.is_empty() && v.majors.is_empty());
    }

    #[test]
    fn test_verdict_with_findings_fails() {
        let v = ValidatorVerdict::with_findings(vec!["no auth".to_string()], vec![]);
        assert!(!v.passed);
        let v = ValidatorVerdict::with_findings(vec![], vec!["slow query".to_string()]);
        assert!(!v.passed);
        assert!(ValidatorVerdict::with_findings(vec![], vec![]).passed);
    }

    #[tokio::test]
    async fn test_fixed_validator_returns_its_verdict() {
        use prp_core::{Blueprint, DeterministicClock, PrpState, SequenceIdGenerator};

        let clock = DeterministicClock::from_epoch();
        let ids = SequenceIdGenerator::new();
        let state = PrpState::new(Blueprint::new("t", "d", vec![]), None, &clock, &ids);

        let v = FixedValidator::blocking("security-scan", "open CVE");
        assert_eq!(v.name(), "security-scan");
        let verdict = v.validate(&state).await.unwrap();
        assert_eq!(verdict.blockers, vec!["open CVE".to_string()]);
    }
}
