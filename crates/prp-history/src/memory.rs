//! In-memory execution history.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use prp_core::{Phase, PrpState};

use crate::error::{HistoryError, HistoryResult};
use crate::store::ExecutionHistory;

/// Rank used for the monotonicity check. Both terminal phases share the
/// top rank: nothing may follow either of them.
fn phase_rank(phase: Phase) -> u8 {
    match phase {
        Phase::Strategy => 0,
        Phase::Build => 1,
        Phase::Evaluation => 2,
        Phase::Completed | Phase::Recycled => 3,
    }
}

/// In-memory history backed by a `HashMap<run_id, Vec<PrpState>>`.
///
/// The single mutex serializes same-run appends; independent runs only
/// contend for the map lock itself, never for each other's entries.
#[derive(Debug, Default)]
pub struct MemoryExecutionHistory {
    runs: Mutex<HashMap<String, Vec<PrpState>>>,
}

impl MemoryExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Contract checks applied before an append is committed.
fn check_append(run_id: &str, prior: &[PrpState], state: &PrpState) -> HistoryResult<()> {
    if state.run_id != run_id {
        return Err(HistoryError::Corruption {
            run_id: run_id.to_string(),
            detail: format!("snapshot belongs to run {}", state.run_id),
        });
    }
    let Some(last) = prior.last() else {
        return Ok(());
    };
    if last.phase.is_terminal() {
        return Err(HistoryError::Corruption {
            run_id: run_id.to_string(),
            detail: format!("run already terminal in phase {}", last.phase),
        });
    }
    if phase_rank(state.phase) < phase_rank(last.phase) {
        return Err(HistoryError::Corruption {
            run_id: run_id.to_string(),
            detail: format!(
                "phase regression: {} recorded after {}",
                state.phase, last.phase
            ),
        });
    }
    // Evidence is append-only across snapshots of the same run.
    if state.evidence.len() < last.evidence.len()
        || !last
            .evidence
            .iter()
            .zip(state.evidence.iter())
            .all(|(a, b)| a.id == b.id)
    {
        return Err(HistoryError::Corruption {
            run_id: run_id.to_string(),
            detail: "evidence sequence is not a superset of the prior snapshot".to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl ExecutionHistory for MemoryExecutionHistory {
    async fn append(&self, run_id: &str, state: PrpState) -> HistoryResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let entries = runs.entry(run_id.to_string()).or_default();
        check_append(run_id, entries, &state)?;
        entries.push(state);
        Ok(())
    }

    async fn get(&self, run_id: &str) -> HistoryResult<Vec<PrpState>> {
        let runs = self.runs.lock().unwrap();
        runs.get(run_id)
            .cloned()
            .ok_or_else(|| HistoryError::RunNotFound {
                run_id: run_id.to_string(),
            })
    }

    async fn latest(&self, run_id: &str) -> HistoryResult<Option<PrpState>> {
        let runs = self.runs.lock().unwrap();
        Ok(runs.get(run_id).and_then(|h| h.last().cloned()))
    }

    async fn contains(&self, run_id: &str) -> HistoryResult<bool> {
        let runs = self.runs.lock().unwrap();
        Ok(runs.contains_key(run_id))
    }

    async fn run_ids(&self) -> HistoryResult<Vec<String>> {
        let runs = self.runs.lock().unwrap();
        Ok(runs.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prp_core::{Blueprint, DeterministicClock, SequenceIdGenerator};

    fn new_state() -> PrpState {
        let clock = DeterministicClock::from_epoch();
        let ids = SequenceIdGenerator::new();
        PrpState::new(Blueprint::new("t", "d", vec![]), None, &clock, &ids)
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let history = MemoryExecutionHistory::new();
        let state = new_state();
        let run_id = state.run_id.clone();

        history.append(&run_id, state.clone()).await.unwrap();
        let entries = history.get(&run_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], state);
    }

    #[tokio::test]
    async fn test_get_unknown_run() {
        let history = MemoryExecutionHistory::new();
        let err = history.get("nope").await.unwrap_err();
        assert!(matches!(err, HistoryError::RunNotFound { .. }));
        assert!(!history.contains("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_history_grows_in_order() {
        let history = MemoryExecutionHistory::new();
        let mut state = new_state();
        let run_id = state.run_id.clone();

        history.append(&run_id, state.clone()).await.unwrap();
        state.phase = Phase::Build;
        history.append(&run_id, state.clone()).await.unwrap();
        state.phase = Phase::Evaluation;
        history.append(&run_id, state.clone()).await.unwrap();

        let entries = history.get(&run_id).await.unwrap();
        let phases: Vec<Phase> = entries.iter().map(|s| s.phase).collect();
        assert_eq!(phases, vec![Phase::Strategy, Phase::Build, Phase::Evaluation]);
        assert_eq!(
            history.latest(&run_id).await.unwrap().unwrap().phase,
            Phase::Evaluation
        );
    }

    #[tokio::test]
    async fn test_phase_regression_rejected() {
        let history = MemoryExecutionHistory::new();
        let mut state = new_state();
        let run_id = state.run_id.clone();

        state.phase = Phase::Build;
        history.append(&run_id, state.clone()).await.unwrap();
        state.phase = Phase::Strategy;
        let err = history.append(&run_id, state).await.unwrap_err();
        assert!(matches!(err, HistoryError::Corruption { .. }));
        assert!(err.to_string().contains("regression"));
    }

    #[tokio::test]
    async fn test_append_after_terminal_rejected() {
        let history = MemoryExecutionHistory::new();
        let mut state = new_state();
        let run_id = state.run_id.clone();

        state.phase = Phase::Recycled;
        history.append(&run_id, state.clone()).await.unwrap();
        let err = history.append(&run_id, state).await.unwrap_err();
        assert!(matches!(err, HistoryError::Corruption { .. }));
    }

    #[tokio::test]
    async fn test_run_id_mismatch_rejected() {
        let history = MemoryExecutionHistory::new();
        let state = new_state();
        let err = history.append("some-other-run", state).await.unwrap_err();
        assert!(matches!(err, HistoryError::Corruption { .. }));
    }

    #[tokio::test]
    async fn test_shrunk_evidence_rejected() {
        let history = MemoryExecutionHistory::new();
        let mut state = new_state();
        let run_id = state.run_id.clone();
        state.evidence.push(prp_core::Evidence::new(
            "ev-1".to_string(),
            prp_core::EvidenceKind::Validation,
            "check",
            serde_json::json!({}),
            Phase::Strategy,
            state.metadata.start_time,
        ));
        history.append(&run_id, state.clone()).await.unwrap();

        state.evidence.clear();
        let err = history.append(&run_id, state).await.unwrap_err();
        assert!(err.to_string().contains("evidence"));
    }

    #[tokio::test]
    async fn test_independent_runs_do_not_interfere() {
        let history = std::sync::Arc::new(MemoryExecutionHistory::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let history = history.clone();
            handles.push(tokio::spawn(async move {
                let mut state = new_state();
                // Give each task its own run id.
                state.run_id = format!("run-{}", uuid_like());
                state.id = state.run_id.clone();
                let run_id = state.run_id.clone();
                history.append(&run_id, state.clone()).await.unwrap();
                state.phase = Phase::Build;
                history.append(&run_id, state).await.unwrap();
                run_id
            }));
        }
        for handle in handles {
            let run_id = handle.await.unwrap();
            assert_eq!(history.get(&run_id).await.unwrap().len(), 2);
        }
        assert_eq!(history.run_ids().await.unwrap().len(), 8);
    }

    fn uuid_like() -> String {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(0);
        format!("{:04}", NEXT.fetch_add(1, Ordering::SeqCst))
    }
}
