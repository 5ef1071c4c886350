//! Test utilities for fabula_agents tests.

#[allow(unused_imports)]
pub use fabula_interface::testing::{MockBackend, MockResponse};

use fabula_core::{AgentKind, AgentPrompt, PromptPriority};

/// Prompt whose user text doubles as the mock routing marker.
#[allow(dead_code)]
pub fn prompt(agent: AgentKind, marker: &str, priority: PromptPriority) -> AgentPrompt {
    AgentPrompt::new(agent, format!("You are the {agent} agent."), marker).with_priority(priority)
}
