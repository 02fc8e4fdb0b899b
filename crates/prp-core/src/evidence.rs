//! Immutable evidence records.
//!
//! Evidence proves that a specific check ran and what it found. Records are
//! never mutated or removed; a run's evidence sequence only grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::Phase;

/// Taxonomy of evidence sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceKind {
    /// File inspection or artifact capture.
    File,
    /// Command execution transcript.
    Command,
    /// Test execution result.
    Test,
    /// Static or dynamic analysis output.
    Analysis,
    /// Validator verdict wrapped by a phase executor.
    Validation,
    /// LLM generation artifact.
    LlmGeneration,
    /// Coverage report.
    Coverage,
    /// Accessibility audit.
    A11y,
    /// Security scan finding.
    Security,
    /// Software bill of materials.
    Sbom,
}

/// An immutable record proving a check executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Unique identifier (from the injected [`IdGenerator`](crate::clock::IdGenerator)).
    pub id: String,

    /// What kind of check produced this record.
    pub kind: EvidenceKind,

    /// Name of the producer (validator name, tool name, file path).
    pub source: String,

    /// Serialized details of what the check found.
    pub content: serde_json::Value,

    /// When the record was created (from the injected clock).
    pub timestamp: DateTime<Utc>,

    /// Execution phase the check ran in (strategy, build, or evaluation).
    pub phase: Phase,

    /// Commit the check ran against, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,

    /// Source line range the record refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_range: Option<(u32, u32)>,

    /// Free-form producer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Evidence {
    /// Create an evidence record. Timestamp and id must come from the
    /// injected collaborators, never from ambient sources.
    pub fn new(
        id: String,
        kind: EvidenceKind,
        source: impl Into<String>,
        content: serde_json::Value,
        phase: Phase,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            source: source.into(),
            content,
            timestamp,
            phase,
            commit_sha: None,
            line_range: None,
            metadata: None,
        }
    }

    /// Attach the commit this evidence refers to.
    pub fn with_commit(mut self, sha: impl Into<String>) -> Self {
        self.commit_sha = Some(sha.into());
        self
    }

    /// Attach a source line range.
    pub fn with_line_range(mut self, start: u32, end: u32) -> Self {
        self.line_range = Some((start, end));
        self
    }
}
