//! Typed metadata maps.
//!
//! Internal consumers read metadata through a closed set of keys instead of
//! free-form strings. Only the agent-provider boundary keeps an open map
//! (see [`AgentResponse::provider_metadata`](crate::AgentResponse)).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keys understood by pipeline components.
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
pub enum MetadataKey {
    /// When the pipeline context was built
    BuildTimestamp,
    /// Whether any memory digest was available at build time
    MemoryAvailable,
    /// Version of the canonical fact set seen at build time
    CanonicalVersion,
    /// Marks a response produced without calling the back end
    Skipped,
    /// Marks a response produced by a rewrite pass
    Rewritten,
    /// Prompt tokens reported by the back end
    PromptTokens,
    /// Completion tokens reported by the back end
    CompletionTokens,
    /// Sum of prompt and completion tokens
    TokensUsed,
    /// Execution order used for a pass
    ExecutionOrder,
    /// Intent type being realized
    IntentType,
    /// Number of prompts in a prompt set
    PromptCount,
    /// Number of agent responses
    ResponseCount,
    /// Number of failed agent responses
    FailedCount,
    /// Number of validation errors
    ErrorCount,
    /// Number of validation warnings
    WarningCount,
    /// Number of coherence issues reported by the consistency validator
    CoherenceIssueCount,
    /// Retry attempts recorded by the retry engine
    AttemptCount,
    /// Length of the integrated narrative text
    ContentLength,
    /// Number of structured events extracted during integration
    EventCount,
    /// Agents whose content reached the integrated text
    ContributingAgents,
    /// When a narrative output was generated
    GeneratedAt,
}

/// A value stored in a [`Metadata`] map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::From)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetadataValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Free text
    Text(String),
    /// Point in time
    Timestamp(DateTime<Utc>),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Metadata map keyed by [`MetadataKey`].
///
/// # Examples
///
/// ```
/// use fabula_core::{Metadata, MetadataKey};
///
/// let metadata = Metadata::new()
///     .with(MetadataKey::Skipped, true)
///     .with(MetadataKey::PromptTokens, 42u32);
///
/// assert_eq!(metadata.get_bool(MetadataKey::Skipped), Some(true));
/// assert_eq!(metadata.get_int(MetadataKey::PromptTokens), Some(42));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<MetadataKey, MetadataValue>);

impl Metadata {
    /// Creates an empty metadata map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this map with one more entry.
    pub fn with(mut self, key: MetadataKey, value: impl Into<MetadataValue>) -> Self {
        self.0.insert(key, value.into());
        self
    }

    /// Inserts an entry, returning the previous value for the key.
    pub fn insert(
        &mut self,
        key: MetadataKey,
        value: impl Into<MetadataValue>,
    ) -> Option<MetadataValue> {
        self.0.insert(key, value.into())
    }

    /// Looks up a value.
    pub fn get(&self, key: MetadataKey) -> Option<&MetadataValue> {
        self.0.get(&key)
    }

    /// Looks up a boolean value.
    pub fn get_bool(&self, key: MetadataKey) -> Option<bool> {
        match self.0.get(&key) {
            Some(MetadataValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Looks up an integer value.
    pub fn get_int(&self, key: MetadataKey) -> Option<i64> {
        match self.0.get(&key) {
            Some(MetadataValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Looks up a text value.
    pub fn get_text(&self, key: MetadataKey) -> Option<&str> {
        match self.0.get(&key) {
            Some(MetadataValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Whether the key is present.
    pub fn contains(&self, key: MetadataKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Copies every entry of `other` into this map, overwriting on conflict.
    pub fn extend(&mut self, other: &Metadata) {
        self.0
            .extend(other.0.iter().map(|(key, value)| (*key, value.clone())));
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&MetadataKey, &MetadataValue)> {
        self.0.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn typed_lookups_ignore_mismatched_variants() {
        let metadata = Metadata::new().with(MetadataKey::Skipped, "yes");
        assert_eq!(metadata.get_bool(MetadataKey::Skipped), None);
        assert_eq!(metadata.get_text(MetadataKey::Skipped), Some("yes"));
    }

    #[test]
    fn keys_round_trip_through_snake_case() {
        assert_eq!(MetadataKey::TokensUsed.to_string(), "tokens_used");
        assert_eq!(
            MetadataKey::from_str("build_timestamp").ok(),
            Some(MetadataKey::BuildTimestamp)
        );
    }

    #[test]
    fn extend_overwrites_existing_keys() {
        let mut base = Metadata::new().with(MetadataKey::ErrorCount, 1u32);
        base.extend(&Metadata::new().with(MetadataKey::ErrorCount, 3u32));
        assert_eq!(base.get_int(MetadataKey::ErrorCount), Some(3));
        assert_eq!(base.len(), 1);
    }
}
