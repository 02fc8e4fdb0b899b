//! The execution history contract.

use async_trait::async_trait;
use prp_core::PrpState;

use crate::error::HistoryResult;

/// Append-only per-run log of state snapshots.
///
/// Guarantees:
/// - Entries are never mutated or removed; retention is a collaborator
///   concern, not the store's.
/// - Within a run, phases progress monotonically; an out-of-sequence append
///   is rejected with `HistoryError::Corruption`.
/// - Appends for different `run_id`s never contend. Concurrent appends for
///   the *same* run are a caller error; implementations serialize them
///   rather than silently merging, so the monotonicity check still decides.
#[async_trait]
pub trait ExecutionHistory: Send + Sync {
    /// Append a snapshot to a run's history, creating the run lazily.
    async fn append(&self, run_id: &str, state: PrpState) -> HistoryResult<()>;

    /// All snapshots for a run, in append order.
    async fn get(&self, run_id: &str) -> HistoryResult<Vec<PrpState>>;

    /// The most recent snapshot for a run, if the run exists.
    async fn latest(&self, run_id: &str) -> HistoryResult<Option<PrpState>>;

    /// Whether any history exists for the run.
    async fn contains(&self, run_id: &str) -> HistoryResult<bool>;

    /// All known run ids, in no particular order.
    async fn run_ids(&self) -> HistoryResult<Vec<String>>;
}
