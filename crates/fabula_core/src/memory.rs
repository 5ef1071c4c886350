//! Memory hierarchy levels and digests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Level of the memory hierarchy, ordered from finest to coarsest.
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
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemoryLevel {
    /// A single event
    Event,
    /// A chapter of events
    Chapter,
    /// A story arc spanning chapters
    Arc,
    /// Facts true for the whole world
    World,
}

/// Summary produced by the memory aggregator for one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct MemoryDigest {
    /// Level the digest summarizes
    level: MemoryLevel,
    /// Summary text
    summary: String,
    /// When the digest was produced
    created_at: DateTime<Utc>,
}

impl MemoryDigest {
    /// Creates a digest stamped now.
    pub fn new(level: MemoryLevel, summary: impl Into<String>) -> Self {
        Self {
            level,
            summary: summary.into(),
            created_at: Utc::now(),
        }
    }
}
