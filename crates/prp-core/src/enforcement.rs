//! Enforcement profiles: the immutable policy bundle attached to a run.
//!
//! A profile is an input to a run and is never mutated by executors. Its
//! digest is recorded so audits can prove which policy governed a verdict.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Quantitative quality budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBudgets {
    /// Minimum line coverage percentage.
    pub min_coverage_pct: f32,

    /// Maximum tolerated performance regression percentage.
    pub max_perf_regression_pct: f32,

    /// Minimum accessibility audit score (0-100).
    pub min_a11y_score: u8,
}

/// Architecture rules enforced across the codebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureRules {
    /// Boundaries modules may depend across (e.g. "domain -> storage").
    pub allowed_boundaries: Vec<String>,

    /// Naming convention globs (e.g. "components/**: PascalCase").
    pub naming_conventions: Vec<String>,

    /// Imports that must never cross a boundary.
    pub forbidden_imports: Vec<String>,

    /// Expected top-level repository layout entries.
    pub repo_layout: Vec<String>,
}

/// Governance rules enforced before promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceRules {
    /// Licenses dependencies may carry.
    pub allowed_licenses: Vec<String>,

    /// Path glob to code-owner mapping.
    pub code_owners: BTreeMap<String, String>,

    /// Paths exempt from the structure guard.
    pub structure_guard_exceptions: Vec<String>,

    /// CI checks that must exist and pass.
    pub required_ci_checks: Vec<String>,
}

/// The full policy bundle for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementProfile {
    pub budgets: QualityBudgets,
    pub architecture: ArchitectureRules,
    pub governance: GovernanceRules,
}

impl EnforcementProfile {
    /// Strict preset: production-promotion policy.
    pub fn strict() -> Self {
        Self {
            budgets: QualityBudgets {
                min_coverage_pct: 85.0,
                max_perf_regression_pct: 2.0,
                min_a11y_score: 95,
            },
            architecture: ArchitectureRules {
                allowed_boundaries: vec!["core -> history".to_string()],
                naming_conventions: vec!["src/**: snake_case".to_string()],
                forbidden_imports: vec!["core -> pipeline".to_string()],
                repo_layout: vec!["crates/".to_string(), "Cargo.toml".to_string()],
            },
            governance: GovernanceRules {
                allowed_licenses: vec!["Apache-2.0".to_string(), "MIT".to_string()],
                code_owners: BTreeMap::new(),
                structure_guard_exceptions: vec![],
                required_ci_checks: vec![
                    "build".to_string(),
                    "test".to_string(),
                    "security-scan".to_string(),
                ],
            },
        }
    }

    /// Permissive preset for exploratory runs.
    pub fn permissive() -> Self {
        Self {
            budgets: QualityBudgets {
                min_coverage_pct: 0.0,
                max_perf_regression_pct: 100.0,
                min_a11y_score: 0,
            },
            architecture: ArchitectureRules {
                allowed_boundaries: vec![],
                naming_conventions: vec![],
                forbidden_imports: vec![],
                repo_layout: vec![],
            },
            governance: GovernanceRules {
                allowed_licenses: vec![],
                code_owners: BTreeMap::new(),
                structure_guard_exceptions: vec![],
                required_ci_checks: vec![],
            },
        }
    }

    /// SHA-256 digest of the canonical JSON form, for audit records.
    pub fn digest(&self) -> String {
        let json = serde_json::to_string(self).expect("EnforcementProfile is serializable");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}
