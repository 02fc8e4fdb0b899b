//! Error types for core engine operations.

use thiserror::Error;

use crate::state::Phase;

/// Errors produced by the core PRP engine.
#[derive(Error, Debug)]
pub enum PrpError {
    /// An illegal phase transition was attempted. Fatal: the new state must
    /// not be committed.
    #[error("illegal phase transition {from} -> {to}: {reason}")]
    IllegalTransition {
        from: Phase,
        to: Phase,
        reason: String,
    },

    /// A phase's validation result may only be written once.
    #[error("validation result for phase {phase} already recorded")]
    DuplicateValidation { phase: Phase },

    /// A gate map entry whose key does not match the result's own id.
    #[error("gate map key {key} does not match gate result id {id}")]
    GateKeyMismatch {
        key: crate::gate::GateId,
        id: crate::gate::GateId,
    },

    /// A state aggregate failed boundary validation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A run manifest failed boundary validation.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Serialization error.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core engine operations.
pub type Result<T> = std::result::Result<T, PrpError>;
