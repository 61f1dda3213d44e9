//! Who the liaison speaks for, and how prompts are put together.

use serde::{Deserialize, Serialize};

use crate::generator::GenerateRequest;

/// The represented individual. Every field can be overridden from the
/// config file; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Persona {
    /// Shown as the panel title.
    pub title: String,
    /// Context placed in front of every user query.
    pub preamble: String,
    /// Tone and length constraint sent as the system instruction.
    pub system_instruction: String,
    /// First assistant message of a fresh conversation. Empty disables it.
    pub greeting: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            title: "Liaison Alpha-1".to_string(),
            preamble: "You are Saon Sikder's AI Liaison. Saon is a Flutter Dev & ML Researcher \
                       with 2 publications. He has a YouTube academy. Be sharp and professional."
                .to_string(),
            system_instruction: "Represent Md. Saon Sikder. Be highly intelligent, professional, \
                                 and concise (max 40 words)."
                .to_string(),
            greeting: "Liaison Alpha-1 online. How may I assist your query regarding Saon's \
                       research or development?"
                .to_string(),
        }
    }
}

impl Persona {
    /// Embed the user's text, untouched, after the preamble.
    pub fn compose_prompt(&self, text: &str) -> String {
        let mut prompt = String::new();
        if !self.preamble.is_empty() {
            prompt.push_str(&self.preamble);
            prompt.push(' ');
        }
        prompt.push_str("Query: ");
        prompt.push_str(text);
        prompt
    }

    pub fn request_for(&self, text: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: self.compose_prompt(text),
            system_instruction: self.system_instruction.clone(),
        }
    }

    pub fn greeting(&self) -> Option<&str> {
        if self.greeting.trim().is_empty() {
            None
        } else {
            Some(&self.greeting)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_preamble_and_verbatim_text() {
        let persona = Persona::default();
        let prompt = persona.compose_prompt("  what do you build?  ");
        assert!(prompt.starts_with("You are Saon Sikder's AI Liaison."));
        assert!(prompt.ends_with("Query:   what do you build?  "));
    }

    #[test]
    fn empty_preamble_leaves_only_query() {
        let persona = Persona {
            preamble: String::new(),
            ..Persona::default()
        };
        assert_eq!(persona.compose_prompt("hi"), "Query: hi");
    }

    #[test]
    fn request_carries_system_instruction() {
        let persona = Persona::default();
        let request = persona.request_for("hi");
        assert!(request.system_instruction.contains("max 40 words"));
        assert!(request.prompt.ends_with("Query: hi"));
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let persona: Persona = serde_json::from_str(r#"{"title": "Concierge"}"#).unwrap();
        assert_eq!(persona.title, "Concierge");
        assert_eq!(persona.greeting, Persona::default().greeting);
    }

    #[test]
    fn blank_greeting_is_disabled() {
        let persona = Persona {
            greeting: "   ".to_string(),
            ..Persona::default()
        };
        assert_eq!(persona.greeting(), None);
    }
}
