//! Built-in contradiction checker over character vital status facts.

use fabula_core::{
    CanonicalState, CoherenceViolation, Fact, FactType, ViolationSeverity, ViolationType,
};
use fabula_interface::ContradictionChecker;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Flags entities recorded as both dead and alive.
///
/// Only character state facts are inspected, matched against a small
/// vocabulary of life and death words. A fact that reads as both dead
/// and alive is ambiguous and ignored.
///
/// # Examples
///
/// ```
/// use fabula_consistency::VitalStatusContradictionChecker;
/// use fabula_core::{CanonicalState, Fact, FactType, MemoryLevel};
/// use fabula_interface::ContradictionChecker;
///
/// let mut state = CanonicalState::new("eldoria", MemoryLevel::World);
/// state.add_facts(vec![
///     Fact::new("Bob died at the bridge", FactType::CharacterState, MemoryLevel::World).with_entity("Bob"),
///     Fact::new("Bob is alive and well", FactType::CharacterState, MemoryLevel::World).with_entity("Bob"),
/// ]).unwrap();
///
/// let checker = VitalStatusContradictionChecker::new();
/// assert_eq!(checker.contradictions(&state).len(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VitalStatusContradictionChecker;

const DEAD_WORDS: &[&str] = &["dead", "died", "dies", "killed", "slain", "deceased", "perished"];
const ALIVE_WORDS: &[&str] = &["alive", "living", "survived", "survives", "lives"];

impl VitalStatusContradictionChecker {
    /// Creates the checker with its built-in vocabulary.
    pub fn new() -> Self {
        Self
    }

    /// `Some(true)` for a fact asserting life, `Some(false)` for death.
    fn classify(fact: &Fact) -> Option<bool> {
        let words: Vec<String> = fact
            .content()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let mentions = |vocabulary: &[&str]| words.iter().any(|w| vocabulary.contains(&w.as_str()));
        match (mentions(DEAD_WORDS), mentions(ALIVE_WORDS)) {
            (true, false) => Some(false),
            (false, true) => Some(true),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Record {
    name: String,
    dead: Vec<Uuid>,
    alive: Vec<Uuid>,
}

impl ContradictionChecker for VitalStatusContradictionChecker {
    fn contradictions(&self, state: &CanonicalState) -> Vec<CoherenceViolation> {
        let mut records: BTreeMap<String, Record> = BTreeMap::new();
        for fact in state.facts_of_type(FactType::CharacterState) {
            let Some(alive) = Self::classify(fact) else {
                continue;
            };
            for entity in fact.entities() {
                let record = records.entry(entity.to_lowercase()).or_default();
                if record.name.is_empty() {
                    record.name = entity.clone();
                }
                if alive {
                    record.alive.push(*fact.id());
                } else {
                    record.dead.push(*fact.id());
                }
            }
        }

        let violations: Vec<CoherenceViolation> = records
            .into_values()
            .filter(|r| !r.dead.is_empty() && !r.alive.is_empty())
            .map(|r| {
                CoherenceViolation::new(
                    ViolationType::StatementContradiction,
                    ViolationSeverity::Error,
                    format!("{} is recorded as both dead and alive", r.name),
                    r.dead.into_iter().chain(r.alive),
                )
                .with_level(*state.level())
            })
            .collect();
        debug!(
            state = %state.id(),
            contradictions = violations.len(),
            "Checked vital status facts"
        );
        violations
    }
}
