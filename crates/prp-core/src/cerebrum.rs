//! Terminal decision engine.
//!
//! Once all three phases have validation results, [`decide`] produces the
//! promote/recycle/pending verdict for the run. The reasoning string always
//! cites the phases and blocker/major counts driving the verdict; audits
//! rely on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{Phase, PrpState};
use crate::validation::ValidationGate;

/// The verdict for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Promote the change.
    Promote,
    /// Send the change back.
    Recycle,
    /// Not enough signal to decide yet.
    Pending,
}

/// The decision record attached to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CerebrumDecision {
    pub decision: Verdict,

    /// Names the phases and blocker/major counts behind the verdict.
    pub reasoning: String,

    /// Confidence in [0, 1].
    pub confidence: f64,

    pub timestamp: DateTime<Utc>,
}

/// Decision thresholds.
///
/// Confidence blends the phase pass ratio (weight 0.7) with evidence volume
/// saturating at [`CerebrumConfig::evidence_saturation`] records (weight 0.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CerebrumConfig {
    /// Confidence above which a ready run is promoted.
    pub promote_threshold: f64,

    /// Minimum evidence records before any verdict is reached.
    pub min_evidence: usize,

    /// Evidence count at which the volume term maxes out.
    pub evidence_saturation: usize,
}

impl Default for CerebrumConfig {
    fn default() -> Self {
        Self {
            promote_threshold: 0.7,
            min_evidence: 5,
            evidence_saturation: 10,
        }
    }
}

const PASS_RATIO_WEIGHT: f64 = 0.7;
const EVIDENCE_WEIGHT: f64 = 0.3;

/// Decide the verdict for a run.
///
/// The run is ready iff all three phase results exist, every phase is
/// passed-or-acceptable, and the evidence count meets the minimum. A run
/// that is not ready gets `Pending` with the unmet conditions spelled out.
pub fn decide(state: &PrpState, config: &CerebrumConfig, now: DateTime<Utc>) -> CerebrumDecision {
    let phases = [
        (Phase::Strategy, state.validation_results.strategy.as_ref()),
        (Phase::Build, state.validation_results.build.as_ref()),
        (
            Phase::Evaluation,
            state.validation_results.evaluation.as_ref(),
        ),
    ];

    let missing: Vec<&str> = phases
        .iter()
        .filter(|(_, g)| g.is_none())
        .map(|(p, _)| p.as_str())
        .collect();
    if !missing.is_empty() {
        return CerebrumDecision {
            decision: Verdict::Pending,
            reasoning: format!(
                "awaiting validation results for: {}",
                missing.join(", ")
            ),
            confidence: 0.0,
            timestamp: now,
        };
    }

    let unacceptable: Vec<String> = phases
        .iter()
        .filter_map(|&(p, g)| {
            let gate = g?;
            (!gate.acceptable()).then(|| phase_summary(p, gate))
        })
        .collect();
    if !unacceptable.is_empty() {
        return CerebrumDecision {
            decision: Verdict::Pending,
            reasoning: format!("phases below the bar: {}", unacceptable.join("; ")),
            confidence: 0.0,
            timestamp: now,
        };
    }

    if state.evidence.len() < config.min_evidence {
        return CerebrumDecision {
            decision: Verdict::Pending,
            reasoning: format!(
                "evidence volume {} below minimum {}",
                state.evidence.len(),
                config.min_evidence
            ),
            confidence: 0.0,
            timestamp: now,
        };
    }

    let passed = phases
        .iter()
        .filter(|(_, g)| g.is_some_and(|g| g.passed))
        .count();
    let pass_ratio = passed as f64 / phases.len() as f64;
    let evidence_ratio =
        (state.evidence.len() as f64 / config.evidence_saturation as f64).min(1.0);
    let confidence = PASS_RATIO_WEIGHT * pass_ratio + EVIDENCE_WEIGHT * evidence_ratio;

    let summaries: Vec<String> = phases
        .iter()
        .filter_map(|&(p, g)| g.map(|gate| phase_summary(p, gate)))
        .collect();
    let detail = format!(
        "{}; {} evidence records; confidence {:.2}",
        summaries.join("; "),
        state.evidence.len(),
        confidence
    );

    if confidence > config.promote_threshold {
        CerebrumDecision {
            decision: Verdict::Promote,
            reasoning: format!("all phases acceptable: {detail}"),
            confidence,
            timestamp: now,
        }
    } else {
        CerebrumDecision {
            decision: Verdict::Recycle,
            reasoning: format!(
                "confidence {:.2} below promote threshold {:.2}: {detail}",
                confidence, config.promote_threshold
            ),
            confidence,
            timestamp: now,
        }
    }
}

fn phase_summary(phase: Phase, gate: &ValidationGate) -> String {
    format!(
        "{} {} ({} blockers, {} majors)",
        phase,
        if gate.passed { "passed" } else { "failed" },
        gate.blockers.len(),
        gate.majors.len()
    )
}
