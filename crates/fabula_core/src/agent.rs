//! Agents, prompts and execution topologies.

use serde::{Deserialize, Serialize};

/// A named role bound to one generation call.
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
pub enum AgentKind {
    /// Writes the main prose
    Narrator,
    /// Voices characters
    Character,
    /// Condenses what happened
    Summary,
    /// Reviews text against established facts
    Consistency,
}

/// Scheduling weight of a prompt within a prompt set.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PromptPriority {
    /// Always executed; failure stops a sequential pass
    Required,
    /// Executed only while every earlier call succeeded
    Optional,
    /// Executed only after an earlier call failed
    Fallback,
}

/// Dispatch topology for a prompt set.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionOrder {
    /// Every call at once, joined on all
    Parallel,
    /// One at a time, stopping at the first failed required call
    #[default]
    Sequential,
    /// One at a time, gated by priority and prior outcomes
    Conditional,
}

/// Instructions for one agent.
///
/// # Examples
///
/// ```
/// use fabula_core::{AgentKind, AgentPrompt, PromptPriority};
///
/// let prompt = AgentPrompt::new(AgentKind::Narrator, "You are a narrator.", "Continue the story.")
///     .with_priority(PromptPriority::Optional);
/// assert_eq!(*prompt.priority(), PromptPriority::Optional);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct AgentPrompt {
    /// Target agent
    agent: AgentKind,
    /// System instruction text
    system: String,
    /// User instruction text
    user: String,
    /// Scheduling weight
    priority: PromptPriority,
}

impl AgentPrompt {
    /// Creates a required prompt.
    pub fn new(agent: AgentKind, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            agent,
            system: system.into(),
            user: user.into(),
            priority: PromptPriority::Required,
        }
    }

    /// Builder method to set the priority.
    pub fn with_priority(mut self, priority: PromptPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Ordered prompts plus the topology used to dispatch them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PromptSet {
    /// Prompts in dispatch order
    prompts: Vec<AgentPrompt>,
    /// Dispatch topology
    order: ExecutionOrder,
}

impl PromptSet {
    /// Creates a prompt set.
    pub fn new(prompts: Vec<AgentPrompt>, order: ExecutionOrder) -> Self {
        Self { prompts, order }
    }

    /// First prompt targeting the agent.
    pub fn prompt_for(&self, agent: AgentKind) -> Option<&AgentPrompt> {
        self.prompts.iter().find(|p| *p.agent() == agent)
    }

    /// Number of prompts.
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Whether the set has no prompts.
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
