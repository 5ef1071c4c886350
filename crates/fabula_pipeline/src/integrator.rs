//! The Integrate stage: raw agent output to narrative output.

use chrono::Utc;
use fabula_core::{
    AgentKind, AgentResponse, Metadata, MetadataKey, NarrativeEvent, NarrativeOutput,
    PipelineContext, RawOutput, StoryEvent,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Fence languages that may carry events, in lookup order.
const EVENT_FENCES: [&str; 2] = ["events", "json"];

/// Pull a fenced event block out of generated text.
///
/// Looks for a ```` ```events ```` block, then a ```` ```json ```` block. The
/// block may hold a JSON array of events or a single event object. Recognised
/// shapes become [`NarrativeEvent::Known`]; anything else is kept opaque. The
/// block is removed from the returned prose. A block that is not valid JSON
/// is left in place and yields no events.
///
/// # Examples
///
/// ```
/// use fabula_pipeline::extract_events;
///
/// let text = "Alice crossed the bridge.\n\
///     ```events\n\
///     [{\"type\": \"character_moved\", \"character\": \"Alice\", \"to\": \"harbor\"}]\n\
///     ```";
///
/// let (prose, events) = extract_events(text);
/// assert_eq!(prose, "Alice crossed the bridge.");
/// assert_eq!(events.len(), 1);
/// ```
pub fn extract_events(text: &str) -> (String, Vec<NarrativeEvent>) {
    for language in EVENT_FENCES {
        let fence = format!("```{language}");
        let Some(start) = text.find(&fence) else {
            continue;
        };
        let content_start = start + fence.len();
        // An unclosed fence runs to the end of the text
        let (content_end, block_end) = match text[content_start..].find("```") {
            Some(end) => (content_start + end, content_start + end + 3),
            None => (text.len(), text.len()),
        };

        let body = text[content_start..content_end].trim();
        let events = match serde_json::from_str::<Value>(body) {
            Ok(Value::Array(items)) => items.into_iter().map(to_event).collect(),
            Ok(item @ Value::Object(_)) => vec![to_event(item)],
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(fence = language, error = %e, "Event block is not valid JSON");
                return (text.trim().to_string(), Vec::new());
            }
        };

        let prose = format!("{}\n{}", text[..start].trim_end(), text[block_end..].trim_start());
        return (prose.trim().to_string(), events);
    }
    (text.trim().to_string(), Vec::new())
}

fn to_event(item: Value) -> NarrativeEvent {
    match serde_json::from_value::<StoryEvent>(item.clone()) {
        Ok(event) => NarrativeEvent::Known(event),
        Err(_) => NarrativeEvent::Opaque(item),
    }
}

/// Prose, events and contributing agents selected from one raw output.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct ComposedNarrative {
    /// Integrated prose
    text: String,
    /// Extracted events
    events: Vec<NarrativeEvent>,
    /// Agents whose content reached the prose
    agents: Vec<AgentKind>,
}

/// Selects and combines agent content into the final narrative.
///
/// The first narrator response leads, followed by every character response,
/// separated by blank lines. Summary content is used only when neither is
/// available. Consistency output never reaches the prose; skipped and failed
/// responses contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integrator;

impl Integrator {
    /// Creates an integrator.
    pub fn new() -> Self {
        Self
    }

    /// Compose the narrative text the integration stage would emit.
    pub fn compose(&self, output: &RawOutput) -> ComposedNarrative {
        let usable = |agent: AgentKind| {
            output
                .responses()
                .iter()
                .filter(move |r| *r.agent() == agent && r.has_content())
        };

        let mut selected: Vec<&AgentResponse> = usable(AgentKind::Narrator).take(1).collect();
        selected.extend(usable(AgentKind::Character));
        if selected.is_empty() {
            selected.extend(usable(AgentKind::Summary).take(1));
        }

        let mut paragraphs = Vec::with_capacity(selected.len());
        let mut events = Vec::new();
        let mut agents = Vec::new();
        for response in selected {
            let (prose, found) = extract_events(response.content());
            events.extend(found);
            if !prose.is_empty() {
                paragraphs.push(prose);
            }
            if !agents.contains(response.agent()) {
                agents.push(*response.agent());
            }
        }

        ComposedNarrative {
            text: paragraphs.join("\n\n"),
            events,
            agents,
        }
    }

    /// Produce the narrative output with generation metadata attached.
    pub fn integrate(
        &self,
        output: &RawOutput,
        context: &PipelineContext,
        retry_count: u32,
    ) -> NarrativeOutput {
        let composed = self.compose(output);
        let tokens: i64 = output
            .responses()
            .iter()
            .filter_map(|r| r.metadata().get_int(MetadataKey::TokensUsed))
            .sum();
        let contributors = composed
            .agents
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let metadata = Metadata::new()
            .with(MetadataKey::ContributingAgents, contributors)
            .with(MetadataKey::EventCount, composed.events.len())
            .with(MetadataKey::ContentLength, composed.text.chars().count())
            .with(MetadataKey::TokensUsed, tokens)
            .with(
                MetadataKey::IntentType,
                context.intent().intent_type().to_string(),
            )
            .with(MetadataKey::AttemptCount, retry_count)
            .with(MetadataKey::GeneratedAt, Utc::now());

        debug!(
            agents = composed.agents.len(),
            events = composed.events.len(),
            tokens,
            "Narrative integrated"
        );
        NarrativeOutput::new(composed.text, composed.events, metadata)
    }
}
