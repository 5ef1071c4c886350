//! Patterns that detect a named character acting or speaking.

use fabula_error::{ConsistencyError, ConsistencyErrorKind, FabulaResult};
use regex::Regex;
use tracing::warn;

/// Placeholder replaced with the escaped character name.
const NAME: &str = "{name}";

const ACTION_VERBS: &str = "walked|walks|ran|runs|smiled|smiles|laughed|laughs|nodded|nods|\
    stood|stands|sat|sits|turned|turns|moved|moves|entered|enters|stepped|steps|reached|reaches|\
    grabbed|grabs|took|takes|gave|gives|opened|opens|closed|closes|drew|draws|struck|strikes|\
    attacked|attacks|fought|fights|jumped|jumps|climbed|climbs|rode|rides|waved|waves|\
    pointed|points|looked|looks|picked|picks|carried|carries|left|leaves|arrived|arrives";

const SPEECH_VERBS: &str = "said|says|asked|asks|replied|replies|answered|answers|shouted|shouts|\
    whispered|whispers|muttered|mutters|called|calls|cried|cries|spoke|speaks|yelled|yells";

/// Regex templates that detect a character acting or speaking.
///
/// Every template contains the `{name}` placeholder, which is replaced by the
/// escaped character name before matching. Matching ignores case.
///
/// # Examples
///
/// ```
/// use fabula_consistency::ActionPatterns;
///
/// let patterns = ActionPatterns::default();
/// assert!(patterns.find("Bob", "Bob walked into the room and smiled.").is_some());
/// assert!(patterns.find("Bob", "Everyone remembered Bob.").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPatterns {
    templates: Vec<String>,
}

impl Default for ActionPatterns {
    fn default() -> Self {
        Self {
            templates: vec![
                // Name followed by an action or speech verb, optionally an adverb between
                format!(r"\b{NAME}\b(?:\s+\w+ly)?\s+(?:{ACTION_VERBS}|{SPEECH_VERBS})\b"),
                // Quoted speech attributed after the quote
                format!(r#"["“][^"”]+["”]\s*,?\s*(?:{SPEECH_VERBS})\s+{NAME}\b"#),
                // Script-style speech
                format!(r#"\b{NAME}\s*:\s*["“]"#),
            ],
        }
    }
}

impl ActionPatterns {
    /// Creates a pattern set from custom templates.
    ///
    /// # Errors
    ///
    /// Returns an error if a template lacks the `{name}` placeholder or is not
    /// a valid regular expression.
    #[track_caller]
    pub fn new<I, S>(templates: I) -> FabulaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let templates: Vec<String> = templates.into_iter().map(Into::into).collect();
        for template in &templates {
            if !template.contains(NAME) {
                return Err(ConsistencyError::new(ConsistencyErrorKind::InvalidPattern {
                    pattern: template.clone(),
                    message: format!("missing the {NAME} placeholder"),
                })
                .into());
            }
            if let Err(e) = Regex::new(&template.replace(NAME, "placeholder")) {
                return Err(ConsistencyError::new(ConsistencyErrorKind::InvalidPattern {
                    pattern: template.clone(),
                    message: e.to_string(),
                })
                .into());
            }
        }
        Ok(Self { templates })
    }

    /// The raw templates.
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Compiles the templates for one character name.
    pub fn compile(&self, name: &str) -> Vec<Regex> {
        let escaped = regex::escape(name);
        self.templates
            .iter()
            .filter_map(|template| {
                let pattern = format!("(?i){}", template.replace(NAME, &escaped));
                match Regex::new(&pattern) {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        warn!(%pattern, error = %e, "Skipping uncompilable action pattern");
                        None
                    }
                }
            })
            .collect()
    }

    /// First fragment of the text showing the character acting or speaking.
    pub fn find(&self, name: &str, text: &str) -> Option<String> {
        self.compile(name)
            .iter()
            .find_map(|regex| regex.find(text).map(|m| m.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_attributed_speech() {
        let patterns = ActionPatterns::default();
        assert!(
            patterns
                .find("Bob", "\"We ride at dawn,\" whispered Bob.")
                .is_some()
        );
        assert!(patterns.find("Bob", "Bob: \"Follow me.\"").is_some());
    }

    #[test]
    fn adverb_between_name_and_verb_still_matches() {
        let patterns = ActionPatterns::default();
        let fragment = patterns.find("Bob", "Then bob slowly walked away.");
        assert_eq!(fragment.as_deref(), Some("bob slowly walked"));
    }

    #[test]
    fn names_are_escaped() {
        let patterns = ActionPatterns::default();
        assert!(patterns.find("B.b", "Bob walked home.").is_none());
    }

    #[test]
    fn custom_templates_are_checked() {
        assert!(ActionPatterns::new([r"\bdanced\b"]).is_err());
        assert!(ActionPatterns::new([r"{name} ("]).is_err());
        let custom = ActionPatterns::new([r"\b{name}\s+danced\b"]).expect("valid template");
        assert!(custom.find("Mira", "Mira danced under the moon.").is_some());
    }
}
