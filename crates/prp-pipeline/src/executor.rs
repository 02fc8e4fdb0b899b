//! Phase execution.
//!
//! A phase executor runs every validator configured for the current phase,
//! wraps each outcome as evidence, and writes the phase's single
//! [`ValidationGate`]. The gate is derived purely from the collected
//! findings; the executor adds nothing of its own beyond the failure
//! conversion rules below.

use std::sync::Arc;

use futures::future::join_all;
use prp_core::{Clock, Evidence, EvidenceKind, IdGenerator, PrpState, ValidationGate};
use serde_json::json;
use tracing::info;

use crate::validator::Validator;

/// Runs one phase's validators against a run snapshot.
pub struct PhaseExecutor;

impl PhaseExecutor {
    /// Execute all validators for the state's current phase.
    ///
    /// Rules:
    /// - Every outcome becomes a `validation` evidence record, including
    ///   failures.
    /// - A validator `Err` (crash, timeout) becomes a blocker naming the
    ///   validator; the phase keeps running.
    /// - A verdict with `passed: false` but no findings becomes a major
    ///   naming the validator, so a silent failure cannot pass the gate.
    /// - The gate is recorded exactly once; re-running a phase is an error.
    pub async fn run_phase(
        state: &mut PrpState,
        validators: &[Arc<dyn Validator>],
        clock: &dyn Clock,
        ids: &dyn IdGenerator,
    ) -> anyhow::Result<ValidationGate> {
        let phase = state.phase;
        if !phase.is_execution() {
            anyhow::bail!("cannot execute validators in terminal phase {phase}");
        }

        info!(
            run_id = %state.run_id,
            phase = %phase,
            validators = validators.len(),
            "executing phase"
        );

        let outcomes = {
            let snapshot: &PrpState = state;
            join_all(validators.iter().map(|v| v.validate(snapshot))).await
        };

        let mut blockers = Vec::new();
        let mut majors = Vec::new();
        let mut evidence_ids = Vec::new();

        for (validator, outcome) in validators.iter().zip(outcomes) {
            let name = validator.name();
            let id = ids.next("ev");
            evidence_ids.push(id.clone());

            match outcome {
                Ok(verdict) => {
                    if !verdict.passed && verdict.blockers.is_empty() && verdict.majors.is_empty()
                    {
                        majors.push(format!("{name} reported failure without findings"));
                    }
                    state.evidence.push(Evidence::new(
                        id,
                        EvidenceKind::Validation,
                        name,
                        json!({
                            "passed": verdict.passed,
                            "blockers": verdict.blockers,
                            "majors": verdict.majors,
                            "details": verdict.details,
                        }),
                        phase,
                        clock.now(),
                    ));
                    blockers.extend(verdict.blockers);
                    majors.extend(verdict.majors);
                }
                Err(e) => {
                    let blocker = format!("{name} failed to execute: {e}");
                    state.evidence.push(Evidence::new(
                        id,
                        EvidenceKind::Validation,
                        name,
                        json!({ "passed": false, "error": e.to_string() }),
                        phase,
                        clock.now(),
                    ));
                    blockers.push(blocker);
                }
            }
        }

        let gate = ValidationGate::from_findings(blockers, majors, evidence_ids, clock.now());
        state.validation_results.record(phase, gate.clone())?;

        info!(
            run_id = %state.run_id,
            phase = %phase,
            passed = gate.passed,
            blockers = gate.blockers.len(),
            majors = gate.majors.len(),
            "phase validated"
        );

        Ok(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{FixedValidator, ValidatorVerdict};
    use async_trait::async_trait;
    use prp_core::{Blueprint, DeterministicClock, Phase, SequenceIdGenerator};

    struct CrashingValidator;

    #[async_trait]
    impl Validator for CrashingValidator {
        fn name(&self) -> &str {
            "flaky-tool"
        }

        async fn validate(&self, _state: &PrpState) -> anyhow::Result<ValidatorVerdict> {
            anyhow::bail!("connection reset")
        }
    }

    fn new_state() -> (PrpState, DeterministicClock, SequenceIdGenerator) {
        let clock = DeterministicClock::from_epoch();
        let ids = SequenceIdGenerator::new();
        let state = PrpState::new(Blueprint::new("t", "d", vec![]), None, &clock, &ids);
        (state, clock, ids)
    }

    #[tokio::test]
    async fn test_clean_validators_pass_the_phase() {
        let (mut state, clock, ids) = new_state();
        let validators: Vec<Arc<dyn Validator>> = vec![
            Arc::new(FixedValidator::passing("lint")),
            Arc::new(FixedValidator::passing("unit-tests")),
        ];

        let gate = PhaseExecutor::run_phase(&mut state, &validators, &clock, &ids)
            .await
            .unwrap();

        assert!(gate.passed);
        assert_eq!(state.evidence.len(), 2);
        assert_eq!(gate.evidence.len(), 2);
        assert!(state.validation_results.strategy.is_some());
        // Every evidence record carries the executing phase.
        assert!(state.evidence.iter().all(|e| e.phase == Phase::Strategy));
    }

    #[tokio::test]
    async fn test_blocker_fails_the_phase_but_keeps_evidence() {
        let (mut state, clock, ids) = new_state();
        let validators: Vec<Arc<dyn Validator>> = vec![
            Arc::new(FixedValidator::passing("lint")),
            Arc::new(FixedValidator::blocking("security-scan", "open CVE in dep")),
        ];

        let gate = PhaseExecutor::run_phase(&mut state, &validators, &clock, &ids)
            .await
            .unwrap();

        assert!(!gate.passed);
        assert_eq!(gate.blockers, vec!["open CVE in dep".to_string()]);
        assert_eq!(state.evidence.len(), 2);
    }

    #[tokio::test]
    async fn test_validator_crash_becomes_blocker() {
        let (mut state, clock, ids) = new_state();
        let validators: Vec<Arc<dyn Validator>> = vec![Arc::new(CrashingValidator)];

        let gate = PhaseExecutor::run_phase(&mut state, &validators, &clock, &ids)
            .await
            .unwrap();

        assert!(!gate.passed);
        assert!(gate.blockers[0].contains("flaky-tool"));
        assert!(gate.blockers[0].contains("connection reset"));
        assert_eq!(state.evidence.len(), 1);
    }

    #[tokio::test]
    async fn test_silent_failure_becomes_major() {
        let (mut state, clock, ids) = new_state();
        let verdict = ValidatorVerdict {
            passed: false,
            blockers: vec![],
            majors: vec![],
            details: serde_json::Value::Null,
        };
        let validators: Vec<Arc<dyn Validator>> =
            vec![Arc::new(FixedValidator::new("opaque-check", verdict))];

        let gate = PhaseExecutor::run_phase(&mut state, &validators, &clock, &ids)
            .await
            .unwrap();

        // A single major still passes, but the failure is on record.
        assert!(gate.passed);
        assert_eq!(gate.majors.len(), 1);
        assert!(gate.majors[0].contains("opaque-check"));
    }

    #[tokio::test]
    async fn test_rerunning_a_phase_is_rejected() {
        let (mut state, clock, ids) = new_state();
        let validators: Vec<Arc<dyn Validator>> = vec![Arc::new(FixedValidator::passing("lint"))];

        PhaseExecutor::run_phase(&mut state, &validators, &clock, &ids)
            .await
            .unwrap();
        let err = PhaseExecutor::run_phase(&mut state, &validators, &clock, &ids)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("strategy"));
    }

    #[tokio::test]
    async fn test_terminal_phase_rejected() {
        let (mut state, clock, ids) = new_state();
        state.phase = Phase::Completed;
        let validators: Vec<Arc<dyn Validator>> = vec![];
        let err = PhaseExecutor::run_phase(&mut state, &validators, &clock, &ids)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("terminal"));
    }
}
