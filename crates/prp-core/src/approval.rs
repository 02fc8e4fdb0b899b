//! Human approval records for gated checkpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::GateId;

/// The decision carried by an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Reviewer signed off.
    Approved,
    /// Reviewer blocked the gate.
    Rejected,
    /// Approval requested but not yet decided.
    Pending,
}

impl ApprovalDecision {
    /// Whether this decision unblocks the gate.
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Whether this decision blocks the gate.
    pub fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// A single human sign-off (or rejection) for a gate.
///
/// Approval records are append-only: resolving a gate keeps every prior
/// rejected attempt in the run's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanApproval {
    /// The gate this approval applies to.
    pub gate_id: GateId,

    /// Reviewer identifier.
    pub actor: String,

    /// The decision.
    pub decision: ApprovalDecision,

    /// When the decision was made.
    pub timestamp: DateTime<Utc>,

    /// Commit the reviewer looked at.
    pub commit_sha: String,

    /// Why the reviewer decided this way.
    pub rationale: String,

    /// Optional cryptographic signature over the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl HumanApproval {
    /// Create an approval record. The timestamp must come from the injected clock.
    pub fn new(
        gate_id: GateId,
        actor: impl Into<String>,
        decision: ApprovalDecision,
        commit_sha: impl Into<String>,
        rationale: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            gate_id,
            actor: actor.into(),
            decision,
            timestamp,
            commit_sha: commit_sha.into(),
            rationale: rationale.into(),
            signature: None,
        }
    }
}

/// The authoritative approval for a gate: the latest record in append order.
pub fn latest_approval_for(approvals: &[HumanApproval], gate_id: GateId) -> Option<&HumanApproval> {
    approvals.iter().rev().find(|a| a.gate_id == gate_id)
}
