//! Prompt templates and the registry that resolves them.

use fabula_core::{
    AgentKind, AgentPrompt, ExecutionOrder, IntentType, PipelineContext, PromptPriority, PromptSet,
};
use fabula_error::{FabulaResult, PipelineError, PipelineErrorKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::debug;

/// Builds the prompt for one agent from the pipeline context.
pub trait PromptTemplate: Send + Sync {
    /// Build the prompt.
    fn build(&self, context: &PipelineContext) -> AgentPrompt;
}

impl<T: PromptTemplate + ?Sized> PromptTemplate for Arc<T> {
    fn build(&self, context: &PipelineContext) -> AgentPrompt {
        (**self).build(context)
    }
}

/// Built-in template used when nothing more specific is registered.
///
/// # Examples
///
/// ```
/// use fabula_core::{AgentKind, IntentType, NarrativeIntent, NarrativeSnapshot, PipelineContext, PromptPriority};
/// use fabula_pipeline::{DefaultTemplate, PromptTemplate};
///
/// let context = PipelineContext::builder()
///     .snapshot(NarrativeSnapshot::builder().world_id("eldoria").build().unwrap())
///     .intent(NarrativeIntent::new(IntentType::DescribeScene))
///     .build()
///     .unwrap();
///
/// let prompt = DefaultTemplate::new(AgentKind::Narrator).build(&context);
/// assert_eq!(*prompt.priority(), PromptPriority::Required);
/// assert!(prompt.user().contains(IntentType::DescribeScene.instruction()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultTemplate {
    agent: AgentKind,
}

impl DefaultTemplate {
    /// Creates the default template for an agent.
    pub fn new(agent: AgentKind) -> Self {
        Self { agent }
    }

    fn priority(&self) -> PromptPriority {
        match self.agent {
            AgentKind::Narrator => PromptPriority::Required,
            AgentKind::Character | AgentKind::Consistency => PromptPriority::Optional,
            AgentKind::Summary => PromptPriority::Fallback,
        }
    }

    fn system(&self) -> &'static str {
        match self.agent {
            AgentKind::Narrator => {
                "You are the narrator of an ongoing story. Write vivid prose in the third person. \
                 Characters who are dead or otherwise unable to act must not act or speak. \
                 If the story changes the world, append a fenced ```events block holding a JSON \
                 array of events (character_moved, character_died, item_transferred, \
                 relationship_changed, discovery)."
            }
            AgentKind::Character => {
                "You voice the characters present in the scene. Write only their dialogue and \
                 gestures, in character. Never give lines to characters who cannot act."
            }
            AgentKind::Summary => {
                "You condense the current state of the story into a short paragraph of prose."
            }
            AgentKind::Consistency => {
                "You review the story for contradictions with established facts. \
                 List every contradiction you find, one per line."
            }
        }
    }

    fn user(&self, context: &PipelineContext) -> String {
        let snapshot = context.snapshot();
        let intent = context.intent();
        let mut lines = vec![intent.intent_type().instruction().to_string()];
        if let Some(description) = intent.description() {
            lines.push(format!("Details: {description}"));
        }

        let names = context.active_character_names();
        if !names.is_empty() {
            lines.push(format!("Characters present: {}", names.join(", ")));
        }
        if let Some(location) = context.current_location() {
            lines.push(format!("Location: {location}"));
        }

        let fallen: Vec<String> = snapshot
            .non_living_characters()
            .map(|c| format!("{} ({})", c.name(), c.vital_status()))
            .collect();
        if !fallen.is_empty() {
            lines.push(format!("Cannot act or speak: {}", fallen.join(", ")));
        }

        if !snapshot.recent_events().is_empty() {
            lines.push(String::new());
            lines.push("Recent events:".to_string());
            lines.extend(snapshot.recent_events().iter().map(|event| format!("- {event}")));
        }

        if !context.memory_summaries().is_empty() {
            lines.push(String::new());
            lines.push("What came before:".to_string());
            lines.extend(
                context
                    .memory_summaries()
                    .iter()
                    .map(|(level, summary)| format!("[{level}] {summary}")),
            );
        }

        lines.join("\n").trim_end().to_string()
    }
}

impl PromptTemplate for DefaultTemplate {
    fn build(&self, context: &PipelineContext) -> AgentPrompt {
        AgentPrompt::new(self.agent, self.system(), self.user(context)).with_priority(self.priority())
    }
}

type TemplateRef = Arc<dyn PromptTemplate>;

#[derive(Default)]
struct Templates {
    exact: HashMap<(AgentKind, IntentType), TemplateRef>,
    defaults: HashMap<AgentKind, TemplateRef>,
}

/// Resolves a template per agent and intent type.
///
/// An exact `(agent, intent)` registration wins over the agent's default.
/// The registry is safe to share between concurrent runs.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: RwLock<Templates>,
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let templates = self.templates.read();
        f.debug_struct("TemplateRegistry")
            .field("exact", &templates.exact.keys().collect::<Vec<_>>())
            .field("defaults", &templates.defaults.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding a [`DefaultTemplate`] for every agent kind.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for agent in AgentKind::iter() {
            registry.register_default(agent, DefaultTemplate::new(agent));
        }
        registry
    }

    /// Registers a template for one agent and intent type.
    pub fn register(
        &self,
        agent: AgentKind,
        intent: IntentType,
        template: impl PromptTemplate + 'static,
    ) {
        self.templates
            .write()
            .exact
            .insert((agent, intent), Arc::new(template));
    }

    /// Registers the fallback template for an agent.
    pub fn register_default(&self, agent: AgentKind, template: impl PromptTemplate + 'static) {
        self.templates
            .write()
            .defaults
            .insert(agent, Arc::new(template));
    }

    /// Resolves the template for an agent and intent type.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineErrorKind::TemplateNotFound`] when neither an exact nor
    /// a default template is registered.
    pub fn resolve(&self, agent: AgentKind, intent: IntentType) -> FabulaResult<TemplateRef> {
        let templates = self.templates.read();
        templates
            .exact
            .get(&(agent, intent))
            .or_else(|| templates.defaults.get(&agent))
            .cloned()
            .ok_or_else(|| {
                PipelineError::new(PipelineErrorKind::TemplateNotFound {
                    agent: agent.to_string(),
                    intent: intent.to_string(),
                })
                .into()
            })
    }

    /// Builds one prompt per agent, in the order given.
    ///
    /// # Errors
    ///
    /// Returns an error if `agents` is empty or any agent has no template.
    pub fn build_prompt_set(
        &self,
        context: &PipelineContext,
        agents: &[AgentKind],
        order: ExecutionOrder,
    ) -> FabulaResult<PromptSet> {
        if agents.is_empty() {
            return Err(PipelineError::new(PipelineErrorKind::EmptyPromptSet).into());
        }
        let intent = *context.intent().intent_type();
        let prompts = agents
            .iter()
            .map(|agent| Ok(self.resolve(*agent, intent)?.build(context)))
            .collect::<FabulaResult<Vec<_>>>()?;
        debug!(prompts = prompts.len(), order = %order, "Prompt set built");
        Ok(PromptSet::new(prompts, order))
    }
}
