//! Coherence violations reported by the contradiction checker.

use crate::MemoryLevel;
use chrono::{DateTime, Utc};
use fabula_error::{ConsistencyError, ConsistencyErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Kind of incoherence detected between facts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolationType {
    /// Two statements cannot both be true
    StatementContradiction,
    /// Events are out of order
    SequenceViolation,
    /// An entity is described inconsistently
    EntityInconsistency,
    /// An entity is in two places at once
    LocationInconsistency,
}

/// Severity of a coherence violation or issue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolationSeverity {
    /// Informational only
    Info,
    /// Worth a look, never blocking
    Warning,
    /// Blocking while unresolved
    Error,
}

/// A detected conflict between accepted facts.
///
/// # Examples
///
/// ```
/// use fabula_core::{CoherenceViolation, ViolationSeverity, ViolationType};
/// use uuid::Uuid;
///
/// let violation = CoherenceViolation::new(
///     ViolationType::StatementContradiction,
///     ViolationSeverity::Error,
///     "Bob is both dead and alive",
///     [Uuid::new_v4(), Uuid::new_v4()],
/// );
/// assert!(violation.is_valid());
/// assert!(!violation.is_resolved());
///
/// let resolved = violation.resolve("Bob was resurrected in chapter 3");
/// assert!(resolved.is_resolved());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CoherenceViolation {
    /// Unique identity
    id: Uuid,
    /// What kind of incoherence
    violation_type: ViolationType,
    /// How serious it is
    severity: ViolationSeverity,
    /// Human-readable description
    description: String,
    /// Facts involved in the conflict
    fact_ids: BTreeSet<Uuid>,
    /// How the conflict was resolved
    resolution: Option<String>,
    /// Memory level the violation belongs to
    level: Option<MemoryLevel>,
    /// Detection timestamp
    detected_at: DateTime<Utc>,
    /// Resolution timestamp
    resolved_at: Option<DateTime<Utc>>,
}

impl CoherenceViolation {
    /// Creates an unresolved violation detected now.
    pub fn new(
        violation_type: ViolationType,
        severity: ViolationSeverity,
        description: impl Into<String>,
        fact_ids: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            violation_type,
            severity,
            description: description.into(),
            fact_ids: fact_ids.into_iter().collect(),
            resolution: None,
            level: None,
            detected_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Builder method to set the owning memory level.
    pub fn with_level(mut self, level: MemoryLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Builder method to attach a resolution note without resolving.
    pub fn with_resolution_note(mut self, note: impl Into<String>) -> Self {
        self.resolution = Some(note.into());
        self
    }

    /// Returns a resolved copy stamped now.
    pub fn resolve(self, note: impl Into<String>) -> Self {
        let at = Utc::now().max(self.detected_at);
        self.resolve_at(note, at)
    }

    /// Returns a copy resolved at the given time.
    pub fn resolve_at(mut self, note: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.resolution = Some(note.into());
        self.resolved_at = Some(at);
        self
    }

    /// Whether a resolution timestamp is present.
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Checks the violation's invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if the description is blank, no fact is implicated,
    /// or the resolution predates the detection.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConsistencyError> {
        let reason = if self.description.trim().is_empty() {
            Some("description is blank")
        } else if self.fact_ids.is_empty() {
            Some("no fact is implicated")
        } else if self.resolved_at.is_some_and(|at| at < self.detected_at) {
            Some("resolved before it was detected")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConsistencyError::new(
                ConsistencyErrorKind::InvalidViolation {
                    id: self.id.to_string(),
                    reason: reason.to_string(),
                },
            )),
            None => Ok(()),
        }
    }

    /// Whether the violation satisfies its invariants.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
