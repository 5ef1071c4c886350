//! The accepted, contradiction-checked fact set at one memory level.

use crate::{Fact, FactType, MemoryLevel};
use chrono::{DateTime, Utc};
use fabula_error::{ConsistencyError, ConsistencyErrorKind, FabulaResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Canonical fact set for one world at one memory level.
///
/// Every mutation re-validates the member facts, bumps the version by one and
/// refreshes the timestamp. Invalid input is rejected before it is admitted and
/// leaves the state untouched.
///
/// # Examples
///
/// ```
/// use fabula_core::{CanonicalState, Fact, FactType, MemoryLevel};
///
/// let mut state = CanonicalState::new("eldoria", MemoryLevel::World);
/// state
///     .add_fact(Fact::new("Bob is dead", FactType::CharacterState, MemoryLevel::World).with_entity("Bob"))
///     .unwrap();
/// assert_eq!(*state.version(), 1);
///
/// let rejected = state.add_fact(Fact::new("   ", FactType::Event, MemoryLevel::World));
/// assert!(rejected.is_err());
/// assert_eq!(*state.version(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CanonicalState {
    /// Unique identity
    id: Uuid,
    /// Owning world reference
    world_id: String,
    /// Accepted facts keyed by identity
    #[getter(skip)]
    facts: HashMap<Uuid, Fact>,
    /// Memory level this state represents
    level: MemoryLevel,
    /// Incremented on every mutation
    version: u64,
    /// Last mutation timestamp
    updated_at: DateTime<Utc>,
}

impl CanonicalState {
    /// Creates an empty state at version 0.
    pub fn new(world_id: impl Into<String>, level: MemoryLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            world_id: world_id.into(),
            facts: HashMap::new(),
            level,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Admits one fact. A fact with an existing identity replaces the old one.
    ///
    /// # Errors
    ///
    /// Returns an error if the fact is invalid; the state is left unchanged.
    pub fn add_fact(&mut self, fact: Fact) -> FabulaResult<()> {
        self.add_facts(std::iter::once(fact))
    }

    /// Admits a batch of facts as one mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if any fact in the batch is invalid; none are admitted.
    pub fn add_facts(&mut self, facts: impl IntoIterator<Item = Fact>) -> FabulaResult<()> {
        let incoming: Vec<Fact> = facts.into_iter().collect();
        for fact in &incoming {
            fact.validate()?;
        }

        let mut candidate = self.facts.clone();
        for fact in incoming {
            candidate.insert(*fact.id(), fact);
        }
        Self::validate_members(&candidate)?;

        self.facts = candidate;
        self.touch();
        debug!(
            state = %self.id,
            version = self.version,
            facts = self.facts.len(),
            "Canonical state updated"
        );
        Ok(())
    }

    /// Removes a fact by identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the fact is not part of the state.
    pub fn remove_fact(&mut self, id: &Uuid) -> FabulaResult<Fact> {
        let mut candidate = self.facts.clone();
        let removed = candidate.remove(id).ok_or_else(|| {
            ConsistencyError::new(ConsistencyErrorKind::FactNotFound(id.to_string()))
        })?;
        Self::validate_members(&candidate)?;

        self.facts = candidate;
        self.touch();
        Ok(removed)
    }

    /// Looks up a fact by identity.
    pub fn get(&self, id: &Uuid) -> Option<&Fact> {
        self.facts.get(id)
    }

    /// Whether the fact is part of the state.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.facts.contains_key(id)
    }

    /// Iterates over the accepted facts in no particular order.
    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values()
    }

    /// Facts that reference the entity.
    pub fn facts_for_entity<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Fact> + 'a {
        self.facts.values().filter(move |f| f.references(entity))
    }

    /// Facts of one type.
    pub fn facts_of_type(&self, fact_type: FactType) -> impl Iterator<Item = &Fact> {
        self.facts
            .values()
            .filter(move |f| *f.fact_type() == fact_type)
    }

    /// Number of accepted facts.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether no fact has been accepted.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    fn validate_members(facts: &HashMap<Uuid, Fact>) -> Result<(), ConsistencyError> {
        facts.values().try_for_each(Fact::validate)
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now().max(self.updated_at);
    }
}
