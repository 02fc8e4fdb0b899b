//! PRP Core - domain model and gate engines for the delivery pipeline
//!
//! Provides the data model and pure decision engines behind the gated
//! Plan -> Build -> Evaluate state machine:
//! - `PrpState`: the full run snapshot (blueprint, phase, gates, evidence)
//! - Transition validator: phase-change legality at the engine boundary
//! - `ValidationGate`: per-phase blocker/major summaries with a fixed pass rule
//! - Gate aggregation (G0-G7): automated checks + human approval -> verdict
//! - Cerebrum: the terminal promote/recycle/pending decision
//! - BMAD alignment: drift detection between live state and a run manifest
//!
//! Every collaborator (Clock, IdGenerator) is passed in explicitly and the
//! engines are emission-free: they return values, they never log or notify.

pub mod alignment;
pub mod approval;
pub mod cerebrum;
pub mod clock;
pub mod enforcement;
pub mod error;
pub mod evidence;
pub mod gate;
pub mod state;
pub mod transition;
pub mod validation;

pub use alignment::{
    check_alignment, validate_manifest, BmadAlignmentReport, ManifestGate, ManifestStage,
    RunManifest,
};
pub use approval::{latest_approval_for, ApprovalDecision, HumanApproval};
pub use cerebrum::{decide, CerebrumConfig, CerebrumDecision, Verdict};
pub use clock::{
    Clock, DeterministicClock, IdGenerator, SequenceIdGenerator, SystemClock, UuidGenerator,
};
pub use enforcement::EnforcementProfile;
pub use error::{PrpError, Result};
pub use evidence::{Evidence, EvidenceKind};
pub use gate::{aggregate_gate, AutomatedCheck, CheckStatus, GateId, GateResult, GateStatus};
pub use state::{state_digest, validate_state, Blueprint, Checkpoint, Phase, PrpState, RunMetadata};
pub use transition::validate_transition;
pub use validation::{ValidationGate, ValidationResults, MAJOR_LIMIT};

/// Engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
