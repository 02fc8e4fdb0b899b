//! PRP History - append-only execution history for delivery runs
//!
//! Every state snapshot a run produces is appended here, never edited in
//! place. The store enforces the contract at the append boundary: phases
//! progress monotonically within a run, nothing follows a terminal
//! snapshot, and evidence only grows. Violations are rejected as
//! [`HistoryError::Corruption`] before anything is written.
//!
//! [`MemoryExecutionHistory`] is the in-process implementation; durable
//! backends implement the same [`ExecutionHistory`] trait.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{HistoryError, HistoryResult};
pub use memory::MemoryExecutionHistory;
pub use store::ExecutionHistory;
