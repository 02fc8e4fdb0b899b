//! Per-phase validation summaries and the gate pass rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PrpError, Result};
use crate::state::Phase;

/// Maximum number of major findings a phase may carry and still pass.
///
/// Majors up to the limit escalate to reviewer attention; a blocker, or a
/// fourth major, fails the gate outright.
pub const MAJOR_LIMIT: usize = 3;

/// Summary of one phase's validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationGate {
    /// Whether the phase passed. Always equals
    /// `blockers.is_empty() && majors.len() <= MAJOR_LIMIT`.
    pub passed: bool,

    /// Fatal findings. Any blocker fails the phase.
    pub blockers: Vec<String>,

    /// Tolerated findings, up to [`MAJOR_LIMIT`].
    pub majors: Vec<String>,

    /// Ids of the evidence records backing this summary.
    pub evidence: Vec<String>,

    /// When the summary was produced.
    pub timestamp: DateTime<Utc>,
}

impl ValidationGate {
    /// Build a gate from collected findings, applying the pass rule.
    pub fn from_findings(
        blockers: Vec<String>,
        majors: Vec<String>,
        evidence: Vec<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let passed = blockers.is_empty() && majors.len() <= MAJOR_LIMIT;
        Self {
            passed,
            blockers,
            majors,
            evidence,
            timestamp,
        }
    }

    /// Whether this phase counts toward Cerebrum readiness: passed, or
    /// clean of both blockers and majors.
    pub fn acceptable(&self) -> bool {
        self.passed || (self.blockers.is_empty() && self.majors.is_empty())
    }
}

/// Per-phase validation results, each written exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ValidationGate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<ValidationGate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<ValidationGate>,
}

impl ValidationResults {
    /// The recorded result for an execution phase, if any.
    pub fn for_phase(&self, phase: Phase) -> Option<&ValidationGate> {
        match phase {
            Phase::Strategy => self.strategy.as_ref(),
            Phase::Build => self.build.as_ref(),
            Phase::Evaluation => self.evaluation.as_ref(),
            Phase::Completed | Phase::Recycled => None,
        }
    }

    /// Record a phase's result. Rejects overwrites and terminal phases.
    pub fn record(&mut self, phase: Phase, gate: ValidationGate) -> Result<()> {
        let slot = match phase {
            Phase::Strategy => &mut self.strategy,
            Phase::Build => &mut self.build,
            Phase::Evaluation => &mut self.evaluation,
            Phase::Completed | Phase::Recycled => {
                return Err(PrpError::InvalidState(format!(
                    "terminal phase {phase} cannot carry a validation result"
                )))
            }
        };
        if slot.is_some() {
            return Err(PrpError::DuplicateValidation { phase });
        }
        *slot = Some(gate);
        Ok(())
    }

    /// Whether all three execution phases have recorded results.
    pub fn is_complete(&self) -> bool {
        self.strategy.is_some() && self.build.is_some() && self.evaluation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn gate(blockers: &[&str], majors: &[&str]) -> ValidationGate {
        ValidationGate::from_findings(
            blockers.iter().map(|s| s.to_string()).collect(),
            majors.iter().map(|s| s.to_string()).collect(),
            vec![],
            Utc::now(),
        )
    }

    #[test]
    fn test_clean_gate_passes() {
        assert!(gate(&[], &[]).passed);
    }

    #[test]
    fn test_blocker_fails() {
        assert!(!gate(&["missing auth"], &[]).passed);
    }

    #[test]
    fn test_majors_at_limit_pass() {
        assert!(gate(&[], &["a", "b", "c"]).passed);
    }

    #[test]
    fn test_majors_over_limit_fail() {
        assert!(!gate(&[], &["a", "b", "c", "d"]).passed);
    }

    #[test]
    fn test_acceptable_clean() {
        assert!(gate(&[], &[]).acceptable());
        assert!(gate(&[], &["one major"]).acceptable());
        assert!(!gate(&["blocker"], &[]).acceptable());
    }

    #[test]
    fn test_record_write_once() {
        let mut results = ValidationResults::default();
        results.record(Phase::Strategy, gate(&[], &[])).unwrap();
        let err = results.record(Phase::Strategy, gate(&[], &[])).unwrap_err();
        assert!(matches!(err, PrpError::DuplicateValidation { phase: Phase::Strategy }));
    }

    #[test]
    fn test_record_terminal_phase_rejected() {
        let mut results = ValidationResults::default();
        let err = results.record(Phase::Completed, gate(&[], &[])).unwrap_err();
        assert!(matches!(err, PrpError::InvalidState(_)));
    }

    #[test]
    fn test_is_complete() {
        let mut results = ValidationResults::default();
        assert!(!results.is_complete());
        results.record(Phase::Strategy, gate(&[], &[])).unwrap();
        results.record(Phase::Build, gate(&[], &[])).unwrap();
        assert!(!results.is_complete());
        results.record(Phase::Evaluation, gate(&[], &[])).unwrap();
        assert!(results.is_complete());
    }
}
