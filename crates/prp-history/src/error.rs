//! Error types for the execution history store.

use thiserror::Error;

/// Errors that can occur in the history layer.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// No history exists for the run.
    #[error("run not found: {run_id}")]
    RunNotFound { run_id: String },

    /// An append violated the history contract. Fatal: the append is
    /// rejected and nothing is written.
    #[error("history corruption for run {run_id}: {detail}")]
    Corruption { run_id: String, detail: String },
}

/// Result type for history operations.
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
