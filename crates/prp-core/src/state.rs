//! The run state aggregate.
//!
//! A [`PrpState`] is the full snapshot of one delivery run: blueprint,
//! phase, gates, approvals, evidence, validation results, and decision. It
//! is created once from a blueprint, mutated only through phase executors
//! and gate/approval updates, and becomes immutable once the phase reaches
//! `completed` or `recycled`.
//!
//! Collections that serialize into JSON objects use `BTreeMap` so the
//! canonical form (and therefore [`state_digest`]) is stable.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::approval::HumanApproval;
use crate::cerebrum::CerebrumDecision;
use crate::clock::{Clock, IdGenerator};
use crate::enforcement::EnforcementProfile;
use crate::error::{PrpError, Result};
use crate::evidence::Evidence;
use crate::gate::{GateId, GateResult};
use crate::validation::ValidationResults;

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Planning: requirements analysed, approach decided.
    Strategy,
    /// Implementation.
    Build,
    /// Verification of the built artifact.
    Evaluation,
    /// Terminal: the run was promoted.
    Completed,
    /// Terminal: the run was aborted or sent back.
    Recycled,
}

impl Phase {
    /// Whether this phase ends the run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Recycled)
    }

    /// Whether phase executors may run in this phase.
    pub fn is_execution(self) -> bool {
        matches!(self, Phase::Strategy | Phase::Build | Phase::Evaluation)
    }

    /// The phase a passing run advances into, if any.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Strategy => Some(Phase::Build),
            Phase::Build => Some(Phase::Evaluation),
            Phase::Evaluation => Some(Phase::Completed),
            Phase::Completed | Phase::Recycled => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Strategy => "strategy",
            Phase::Build => "build",
            Phase::Evaluation => "evaluation",
            Phase::Completed => "completed",
            Phase::Recycled => "recycled",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The unit of work a run advances: what to build and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Blueprint {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        requirements: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            requirements,
            metadata: None,
        }
    }
}

/// Run-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// When the run started.
    pub start_time: DateTime<Utc>,

    /// When the run reached a terminal phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Identifier of the processing node currently driving the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_neuron: Option<String>,

    /// Model configuration for generation steps, opaque to the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_config: Option<serde_json::Value>,

    /// Caller-supplied execution context, opaque to the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_context: Option<serde_json::Value>,

    /// When true, every id and timestamp in the run comes from the injected
    /// Clock/IdGenerator and snapshots are byte-reproducible.
    pub deterministic: bool,
}

/// A point-in-time marker recording the digest of the run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    /// Digest of the state at the moment the checkpoint was taken
    /// (excluding the checkpoint entry itself).
    pub state_digest: String,
}

/// The aggregate state of one delivery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrpState {
    /// State identifier.
    pub id: String,

    /// Run identifier; shared by every snapshot of the same run.
    pub run_id: String,

    /// Current phase.
    pub phase: Phase,

    /// The work being delivered.
    pub blueprint: Blueprint,

    /// Policy bundle governing the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcement_profile: Option<EnforcementProfile>,

    /// Gate results keyed by gate id. Keys are restricted to G0..G7 and
    /// each result's `id` must equal its key.
    pub gates: BTreeMap<GateId, GateResult>,

    /// Append-only approval trail (rejected attempts are retained).
    pub approvals: Vec<HumanApproval>,

    /// Free-form outputs published by collaborators.
    pub outputs: BTreeMap<String, serde_json::Value>,

    /// Per-phase validation summaries, each written exactly once.
    pub validation_results: ValidationResults,

    /// Append-only evidence sequence.
    pub evidence: Vec<Evidence>,

    /// Terminal verdict, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cerebrum: Option<CerebrumDecision>,

    /// Run metadata.
    pub metadata: RunMetadata,

    /// Point-in-time digests of the run state.
    pub checkpoints: Vec<Checkpoint>,
}

impl PrpState {
    /// Create the initial strategy-phase state for a new run.
    pub fn new(
        blueprint: Blueprint,
        enforcement_profile: Option<EnforcementProfile>,
        clock: &dyn Clock,
        ids: &dyn IdGenerator,
    ) -> Self {
        Self {
            id: ids.next("state"),
            run_id: ids.next("run"),
            phase: Phase::Strategy,
            blueprint,
            enforcement_profile,
            gates: BTreeMap::new(),
            approvals: Vec::new(),
            outputs: BTreeMap::new(),
            validation_results: ValidationResults::default(),
            evidence: Vec::new(),
            cerebrum: None,
            metadata: RunMetadata {
                start_time: clock.now(),
                end_time: None,
                current_neuron: None,
                llm_config: None,
                execution_context: None,
                deterministic: false,
            },
            checkpoints: Vec::new(),
        }
    }

    /// Whether the run can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Append an approval record. The trail is append-only; earlier
    /// rejections stay in place.
    pub fn record_approval(&mut self, approval: HumanApproval) {
        self.approvals.push(approval);
    }

    /// Insert or replace a gate result, keyed by its own id so the map key
    /// invariant holds by construction.
    pub fn upsert_gate(&mut self, result: GateResult) {
        self.gates.insert(result.id, result);
    }

    /// Take a checkpoint: record the digest of the current state.
    pub fn checkpoint(&mut self, clock: &dyn Clock, ids: &dyn IdGenerator) {
        let digest = state_digest(self);
        self.checkpoints.push(Checkpoint {
            id: ids.next("ckpt"),
            timestamp: clock.now(),
            phase: self.phase,
            state_digest: digest,
        });
    }
}

/// SHA-256 digest of the canonical JSON form of a state.
///
/// With deterministic collaborators, two runs over identical inputs yield
/// identical digests.
pub fn state_digest(state: &PrpState) -> String {
    let json = serde_json::to_vec(state).expect("PrpState is serializable");
    let mut hasher = Sha256::new();
    hasher.update(&json);
    hex::encode(hasher.finalize())
}

/// Boundary validation for a state aggregate.
///
/// Invariant checks live here rather than in the type system: gate keys
/// must match their result ids, evidence must belong to an execution phase,
/// identifiers must be present, and checkpoint ids must be unique.
pub fn validate_state(state: &PrpState) -> Result<()> {
    if state.id.is_empty() || state.run_id.is_empty() {
        return Err(PrpError::InvalidState(
            "state and run identifiers must be non-empty".to_string(),
        ));
    }
    if state.blueprint.title.is_empty() {
        return Err(PrpError::InvalidState(
            "blueprint title must be non-empty".to_string(),
        ));
    }
    for (key, result) in &state.gates {
        if *key != result.id {
            return Err(PrpError::GateKeyMismatch {
                key: *key,
                id: result.id,
            });
        }
    }
    for ev in &state.evidence {
        if !ev.phase.is_execution() {
            return Err(PrpError::InvalidState(format!(
                "evidence {} carries terminal phase {}",
                ev.id, ev.phase
            )));
        }
    }
    let mut seen = std::collections::HashSet::new();
    for ckpt in &state.checkpoints {
        if !seen.insert(ckpt.id.as_str()) {
            return Err(PrpError::InvalidState(format!(
                "duplicate checkpoint id {}",
                ckpt.id
            )));
        }
    }
    Ok(())
}
