//! The eight fixed quality gates (G0-G7) and their aggregation rule.
//!
//! [`aggregate_gate`] turns a gate's automated checks plus an optional human
//! approval into a [`GateResult`]. Automated success can never substitute
//! for a required human sign-off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approval::HumanApproval;

/// Identifier of one of the eight fixed gates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum GateId {
    G0,
    G1,
    G2,
    G3,
    G4,
    G5,
    G6,
    G7,
}

impl GateId {
    /// All gates in order.
    pub const ALL: [GateId; 8] = [
        GateId::G0,
        GateId::G1,
        GateId::G2,
        GateId::G3,
        GateId::G4,
        GateId::G5,
        GateId::G6,
        GateId::G7,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateId::G0 => "G0",
            GateId::G1 => "G1",
            GateId::G2 => "G2",
            GateId::G3 => "G3",
            GateId::G4 => "G4",
            GateId::G5 => "G5",
            GateId::G6 => "G6",
            GateId::G7 => "G7",
        }
    }
}

impl std::fmt::Display for GateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

/// Outcome of a single automated check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
}

/// One automated check contributing to a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatedCheck {
    /// Check name (e.g. "typecheck", "licence-scan").
    pub name: String,

    /// Outcome.
    pub status: CheckStatus,

    /// Captured output, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Duration in milliseconds, if measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl AutomatedCheck {
    pub fn new(name: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            status,
            output: None,
            duration_ms: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// The aggregated result for one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Which gate this is. Must equal its key in `PrpState::gates`.
    pub id: GateId,

    /// Human-readable gate name.
    pub name: String,

    /// Aggregated status.
    pub status: GateStatus,

    /// Whether a human sign-off is required to pass.
    pub requires_human_approval: bool,

    /// The authoritative approval used for aggregation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_approval: Option<HumanApproval>,

    /// The automated checks that fed this result.
    pub automated_checks: Vec<AutomatedCheck>,

    /// Artifact references produced while evaluating the gate.
    pub artifacts: Vec<String>,

    /// Evidence ids backing this result.
    pub evidence: Vec<String>,

    /// When the result was aggregated.
    pub timestamp: DateTime<Utc>,

    /// What has to happen for a non-passed gate to move forward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<Vec<String>>,
}

/// Aggregate automated checks and an optional human approval into a
/// [`GateResult`].
///
/// Rules, in precedence order:
/// 1. A rejected approval forces `Failed`, even when every check passed.
/// 2. A required approval that is missing (or still pending) keeps the gate
///    `Pending` regardless of automated outcomes.
/// 3. Any failed check yields `Failed`.
/// 4. All checks passed (and the approval rule is satisfied) yields `Passed`.
/// 5. Otherwise some checks were skipped and the gate is `Skipped`.
pub fn aggregate_gate(
    id: GateId,
    name: impl Into<String>,
    checks: Vec<AutomatedCheck>,
    requires_human_approval: bool,
    approval: Option<&HumanApproval>,
    timestamp: DateTime<Utc>,
) -> GateResult {
    let failed: Vec<&str> = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Fail)
        .map(|c| c.name.as_str())
        .collect();
    let all_pass = checks.iter().all(|c| c.status == CheckStatus::Pass);

    let mut next_steps = Vec::new();
    let status = if approval.is_some_and(|a| a.decision.is_rejected()) {
        next_steps.push(format!(
            "address rejection by {} and request a new approval cycle",
            approval.map(|a| a.actor.as_str()).unwrap_or("reviewer"),
        ));
        GateStatus::Failed
    } else if requires_human_approval && !approval.is_some_and(|a| a.decision.is_approved()) {
        next_steps.push(format!("await human approval for gate {id}"));
        if !failed.is_empty() {
            next_steps.push(format!("failing checks: {}", failed.join(", ")));
        }
        GateStatus::Pending
    } else if !failed.is_empty() {
        next_steps.push(format!("fix failing checks: {}", failed.join(", ")));
        GateStatus::Failed
    } else if all_pass {
        GateStatus::Passed
    } else {
        let skipped: Vec<&str> = checks
            .iter()
            .filter(|c| c.status == CheckStatus::Skip)
            .map(|c| c.name.as_str())
            .collect();
        next_steps.push(format!("run skipped checks: {}", skipped.join(", ")));
        GateStatus::Skipped
    };

    GateResult {
        id,
        name: name.into(),
        status,
        requires_human_approval,
        human_approval: approval.cloned(),
        automated_checks: checks,
        artifacts: Vec::new(),
        evidence: Vec::new(),
        timestamp,
        next_steps: if next_steps.is_empty() {
            None
        } else {
            Some(next_steps)
        },
    }
}
