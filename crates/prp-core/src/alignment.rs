//! BMAD alignment: diff a live run state against its manifest.
//!
//! The manifest is produced independently of the engine; comparing the two
//! surfaces blueprint drift, requirement gaps, and approvals that should
//! have blocked a gate. The checker never fails and never mutates either
//! input: drift is data, collected into the report for governance tooling.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::approval::latest_approval_for;
use crate::error::{PrpError, Result};
use crate::gate::{GateId, GateStatus};
use crate::state::{Blueprint, PrpState};

/// Gate requirements declared by a manifest stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestGate {
    /// Gates this stage draws its verdict from.
    pub source_gate_ids: Vec<GateId>,

    /// Whether the stage requires a human sign-off.
    pub requires_human_approval: bool,
}

/// One stage of the independently produced run plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestStage {
    /// Stage key (e.g. "plan", "implement", "verify").
    pub key: String,

    /// Declared stage status; carried for governance, not compared here.
    pub status: String,

    /// Gate requirements for the stage.
    pub gate: ManifestGate,
}

/// An independently generated declarative description of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub blueprint: Blueprint,
    pub stages: Vec<ManifestStage>,
}

/// Blueprint comparison section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintAlignment {
    pub title_matches: bool,
    pub description_matches: bool,

    /// Requirements in the live state but absent from the manifest.
    pub missing_requirements: Vec<String>,

    /// Requirements in the manifest but absent from the live state.
    pub extra_requirements: Vec<String>,
}

/// Approval accounting section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalAlignment {
    /// Gates that require approval with no record at all.
    pub pending_gate_ids: Vec<GateId>,

    /// Count of gates requiring approval.
    pub required: usize,

    /// Count of those whose latest approval is approved.
    pub granted: usize,
}

/// Per-stage findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageAlignment {
    pub key: String,
    pub issues: Vec<String>,
}

/// The full alignment report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmadAlignmentReport {
    pub blueprint: BlueprintAlignment,
    pub approvals: ApprovalAlignment,
    pub stages: Vec<StageAlignment>,

    /// Run-level issues (blueprint drift, unresolved approvals).
    pub issues: Vec<String>,

    /// True iff no run-level issue and no stage carries issues.
    pub is_aligned: bool,
}

/// Compare a live state against its manifest.
///
/// Requirement comparison is set-based on exact strings; approval lookup
/// uses the latest record per gate. Pure and idempotent.
pub fn check_alignment(state: &PrpState, manifest: &RunManifest) -> BmadAlignmentReport {
    let mut issues = Vec::new();

    // Blueprint drift.
    let title_matches = state.blueprint.title == manifest.blueprint.title;
    let description_matches = state.blueprint.description == manifest.blueprint.description;
    if !title_matches {
        issues.push(format!(
            "blueprint title drift: state '{}' vs manifest '{}'",
            state.blueprint.title, manifest.blueprint.title
        ));
    }
    if !description_matches {
        issues.push("blueprint description drift".to_string());
    }

    let state_reqs: BTreeSet<&str> = state
        .blueprint
        .requirements
        .iter()
        .map(String::as_str)
        .collect();
    let manifest_reqs: BTreeSet<&str> = manifest
        .blueprint
        .requirements
        .iter()
        .map(String::as_str)
        .collect();
    let missing_requirements: Vec<String> = state_reqs
        .difference(&manifest_reqs)
        .map(|s| s.to_string())
        .collect();
    let extra_requirements: Vec<String> = manifest_reqs
        .difference(&state_reqs)
        .map(|s| s.to_string())
        .collect();
    for req in &missing_requirements {
        issues.push(format!("requirement missing from manifest: {req}"));
    }
    for req in &extra_requirements {
        issues.push(format!("requirement missing from state: {req}"));
    }

    // Approval accounting: gates flagged by either the live state or a
    // manifest stage.
    let mut required_gates: BTreeSet<GateId> = state
        .gates
        .values()
        .filter(|g| g.requires_human_approval)
        .map(|g| g.id)
        .collect();
    for stage in &manifest.stages {
        if stage.gate.requires_human_approval {
            required_gates.extend(stage.gate.source_gate_ids.iter().copied());
        }
    }
    let pending_gate_ids: Vec<GateId> = required_gates
        .iter()
        .filter(|id| latest_approval_for(&state.approvals, **id).is_none())
        .copied()
        .collect();
    let granted = required_gates
        .iter()
        .filter(|id| {
            latest_approval_for(&state.approvals, **id)
                .is_some_and(|a| a.decision.is_approved())
        })
        .count();
    for id in &pending_gate_ids {
        issues.push(format!("gate {id} requires approval but none is recorded"));
    }

    // Per-stage gate checks.
    let stages: Vec<StageAlignment> = manifest
        .stages
        .iter()
        .map(|stage| {
            let mut stage_issues = Vec::new();
            for gate_id in &stage.gate.source_gate_ids {
                match state.gates.get(gate_id) {
                    None => stage_issues.push(format!(
                        "references gate {gate_id} missing from run state"
                    )),
                    Some(gate) => {
                        let requires =
                            stage.gate.requires_human_approval || gate.requires_human_approval;
                        let approved = latest_approval_for(&state.approvals, *gate_id)
                            .is_some_and(|a| a.decision.is_approved());
                        if gate.status == GateStatus::Passed && requires && !approved {
                            stage_issues.push(format!(
                                "gate {gate_id} passed without required approval"
                            ));
                        }
                    }
                }
            }
            StageAlignment {
                key: stage.key.clone(),
                issues: stage_issues,
            }
        })
        .collect();

    let is_aligned = issues.is_empty() && stages.iter().all(|s| s.issues.is_empty());

    BmadAlignmentReport {
        blueprint: BlueprintAlignment {
            title_matches,
            description_matches,
            missing_requirements,
            extra_requirements,
        },
        approvals: ApprovalAlignment {
            pending_gate_ids,
            required: required_gates.len(),
            granted,
        },
        stages,
        issues,
        is_aligned,
    }
}

/// Boundary validation for a manifest aggregate.
pub fn validate_manifest(manifest: &RunManifest) -> Result<()> {
    if manifest.blueprint.title.is_empty() {
        return Err(PrpError::InvalidManifest(
            "blueprint title must be non-empty".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for stage in &manifest.stages {
        if stage.key.is_empty() {
            return Err(PrpError::InvalidManifest(
                "stage key must be non-empty".to_string(),
            ));
        }
        if !seen.insert(stage.key.as_str()) {
            return Err(PrpError::InvalidManifest(format!(
                "duplicate stage key {}",
                stage.key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApprovalDecision, HumanApproval};
    use crate::clock::{DeterministicClock, SequenceIdGenerator};
    use crate::gate::{aggregate_gate, AutomatedCheck, CheckStatus};
    use crate::state::Blueprint;
    use chrono::Utc;

    fn blueprint(reqs: &[&str]) -> Blueprint {
        Blueprint::new(
            "checkout flow",
            "one-page checkout",
            reqs.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn state(reqs: &[&str]) -> PrpState {
        let clock = DeterministicClock::from_epoch();
        let ids = SequenceIdGenerator::new();
        PrpState::new(blueprint(reqs), None, &clock, &ids)
    }

    fn manifest(reqs: &[&str], stages: Vec<ManifestStage>) -> RunManifest {
        RunManifest {
            blueprint: blueprint(reqs),
            stages,
        }
    }

    fn stage(key: &str, gates: Vec<GateId>, requires_approval: bool) -> ManifestStage {
        ManifestStage {
            key: key.to_string(),
            status: "active".to_string(),
            gate: ManifestGate {
                source_gate_ids: gates,
                requires_human_approval: requires_approval,
            },
        }
    }

    #[test]
    fn test_aligned_run() {
        let state = state(&["PCI compliance"]);
        let manifest = manifest(&["PCI compliance"], vec![]);
        let report = check_alignment(&state, &manifest);
        assert!(report.is_aligned);
        assert!(report.issues.is_empty());
        assert!(report.blueprint.title_matches);
    }

    #[test]
    fn test_extra_requirement_in_manifest() {
        // Manifest lists a requirement absent from the live blueprint.
        let state = state(&["PCI compliance"]);
        let manifest = manifest(&["PCI compliance", "SOC2 audit"], vec![]);
        let report = check_alignment(&state, &manifest);
        assert_eq!(report.blueprint.extra_requirements, vec!["SOC2 audit"]);
        assert!(!report.is_aligned);
    }

    #[test]
    fn test_missing_requirement_in_manifest() {
        let state = state(&["PCI compliance", "p95 < 200ms"]);
        let manifest = manifest(&["PCI compliance"], vec![]);
        let report = check_alignment(&state, &manifest);
        assert_eq!(report.blueprint.missing_requirements, vec!["p95 < 200ms"]);
        assert!(!report.is_aligned);
    }

    #[test]
    fn test_title_drift() {
        let state = state(&[]);
        let mut m = manifest(&[], vec![]);
        m.blueprint.title = "payments flow".to_string();
        let report = check_alignment(&state, &m);
        assert!(!report.blueprint.title_matches);
        assert!(!report.is_aligned);
    }

    #[test]
    fn test_stage_references_missing_gate() {
        let state = state(&[]);
        let m = manifest(&[], vec![stage("verify", vec![GateId::G5], false)]);
        let report = check_alignment(&state, &m);
        assert_eq!(report.stages.len(), 1);
        assert!(report.stages[0].issues[0].contains("G5"));
        assert!(!report.is_aligned);
    }

    #[test]
    fn test_passed_gate_without_required_approval() {
        let mut s = state(&[]);
        let checks = vec![AutomatedCheck::new("tests", CheckStatus::Pass)];
        // Gate aggregated without the approval requirement, then demanded
        // by the manifest stage: the checker must flag it.
        s.upsert_gate(aggregate_gate(GateId::G3, "verify", checks, false, None, Utc::now()));
        let m = manifest(&[], vec![stage("verify", vec![GateId::G3], true)]);
        let report = check_alignment(&s, &m);
        assert!(report.stages[0]
            .issues
            .iter()
            .any(|i| i.contains("passed without required approval")));
        assert!(report.approvals.pending_gate_ids.contains(&GateId::G3));
        assert!(!report.is_aligned);
    }

    #[test]
    fn test_approved_gate_is_clean() {
        let mut s = state(&[]);
        let approval = HumanApproval::new(
            GateId::G3,
            "alice",
            ApprovalDecision::Approved,
            "abc",
            "ok",
            Utc::now(),
        );
        s.record_approval(approval.clone());
        let checks = vec![AutomatedCheck::new("tests", CheckStatus::Pass)];
        s.upsert_gate(aggregate_gate(
            GateId::G3,
            "verify",
            checks,
            true,
            Some(&approval),
            Utc::now(),
        ));
        let m = manifest(&[], vec![stage("verify", vec![GateId::G3], true)]);
        let report = check_alignment(&s, &m);
        assert!(report.is_aligned, "issues: {:?}", report.issues);
        assert_eq!(report.approvals.required, 1);
        assert_eq!(report.approvals.granted, 1);
        assert!(report.approvals.pending_gate_ids.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let state = state(&["PCI compliance"]);
        let m = manifest(&["SOC2 audit"], vec![stage("verify", vec![GateId::G1], true)]);
        let first = check_alignment(&state, &m);
        let second = check_alignment(&state, &m);
        assert_eq!(first, second);
    }

    #[test]
    fn test_validate_manifest_duplicate_stage() {
        let m = manifest(
            &[],
            vec![stage("verify", vec![], false), stage("verify", vec![], false)],
        );
        assert!(matches!(
            validate_manifest(&m).unwrap_err(),
            PrpError::InvalidManifest(_)
        ));
    }

    #[test]
    fn test_validate_manifest_ok() {
        let m = manifest(&[], vec![stage("plan", vec![], false)]);
        assert!(validate_manifest(&m).is_ok());
    }
}
