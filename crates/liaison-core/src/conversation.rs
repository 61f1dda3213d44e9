//! The conversation state machine
//!
//! A conversation is either `Idle` (accepting input) or `Awaiting` (one
//! request outstanding). `submit` is the only way in, `settle` the only way
//! out, so the pending flag cannot be left set once a request finishes.

use tracing::{debug, warn};

use crate::error::GenerateError;
use crate::generator::GenerateRequest;
use crate::message::Message;
use crate::persona::Persona;

/// Shown when the service answered with no usable text.
pub const FALLBACK_EMPTY: &str = "Connection interrupted.";
/// Shown when the request failed for any reason.
pub const FALLBACK_OFFLINE: &str = "Neural link offline.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Awaiting,
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    transcript: Vec<Message>,
    draft: String,
    phase: Phase,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation opened by the persona's greeting, if it has one.
    pub fn with_greeting(persona: &Persona) -> Self {
        let mut conversation = Self::new();
        if let Some(greeting) = persona.greeting() {
            conversation.transcript.push(Message::assistant(greeting));
        }
        conversation
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn last(&self) -> Option<&Message> {
        self.transcript.last()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase == Phase::Awaiting
    }

    /// Whether `text` would be accepted right now.
    pub fn accepts(&self, text: &str) -> bool {
        self.phase == Phase::Idle && !text.trim().is_empty()
    }

    /// Submit whatever is in the draft.
    ///
    /// Returns the request to send, or `None` when the submission was
    /// dropped (blank draft or a request already outstanding). A dropped
    /// submission leaves the draft alone.
    pub fn submit_draft(&mut self, persona: &Persona) -> Option<GenerateRequest> {
        if !self.accepts(&self.draft) {
            return None;
        }
        let text = std::mem::take(&mut self.draft);
        Some(self.begin(text, persona))
    }

    /// Submit `text` directly, bypassing the draft. The draft is still
    /// cleared on success.
    pub fn submit(&mut self, text: &str, persona: &Persona) -> Option<GenerateRequest> {
        if !self.accepts(text) {
            debug!(pending = self.is_pending(), "submission dropped");
            return None;
        }
        self.draft.clear();
        Some(self.begin(text.to_string(), persona))
    }

    fn begin(&mut self, text: String, persona: &Persona) -> GenerateRequest {
        let request = persona.request_for(&text);
        self.transcript.push(Message::user(text));
        self.phase = Phase::Awaiting;
        request
    }

    /// Record how the outstanding request ended and return to `Idle`.
    ///
    /// Does nothing when no request is outstanding.
    pub fn settle(&mut self, outcome: Result<String, GenerateError>) -> Option<&Message> {
        if self.phase != Phase::Awaiting {
            return None;
        }
        let text = match outcome {
            Ok(reply) if reply.is_empty() => {
                warn!("service returned an empty reply");
                FALLBACK_EMPTY.to_string()
            }
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "generation failed");
                FALLBACK_OFFLINE.to_string()
            }
        };
        self.transcript.push(Message::assistant(text));
        self.phase = Phase::Idle;
        self.transcript.last()
    }

    pub fn resolve(&mut self, reply: impl Into<String>) -> Option<&Message> {
        self.settle(Ok(reply.into()))
    }

    pub fn fail(&mut self, error: GenerateError) -> Option<&Message> {
        self.settle(Err(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn persona() -> Persona {
        Persona::default()
    }

    #[test]
    fn greeting_opens_the_transcript() {
        let conversation = Conversation::with_greeting(&persona());
        assert_eq!(conversation.transcript().len(), 1);
        assert_eq!(conversation.transcript()[0].role, Role::Assistant);
        assert!(!conversation.is_pending());
    }

    #[test]
    fn submit_appends_user_message_and_waits() {
        let mut conversation = Conversation::new();
        conversation.set_draft("Tell me about the research");
        let request = conversation.submit_draft(&persona());

        assert!(request.is_some());
        assert_eq!(conversation.transcript().len(), 1);
        assert_eq!(conversation.transcript()[0], Message::user("Tell me about the research"));
        assert_eq!(conversation.draft(), "");
        assert_eq!(conversation.phase(), Phase::Awaiting);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut conversation = Conversation::new();
        for text in ["", "   ", "\n\t "] {
            conversation.set_draft(text);
            assert!(conversation.submit_draft(&persona()).is_none());
            assert!(conversation.submit(text, &persona()).is_none());
        }
        assert!(conversation.transcript().is_empty());
        assert!(!conversation.is_pending());
    }

    #[test]
    fn submit_while_awaiting_is_dropped() {
        let mut conversation = Conversation::new();
        conversation.submit("first", &persona()).unwrap();

        conversation.set_draft("second");
        assert!(conversation.submit_draft(&persona()).is_none());
        assert!(conversation.submit("third", &persona()).is_none());

        assert_eq!(conversation.transcript().len(), 1);
        assert_eq!(conversation.draft(), "second");
    }

    #[test]
    fn reply_text_is_appended() {
        let mut conversation = Conversation::new();
        conversation.submit("hi", &persona()).unwrap();
        let reply = conversation.resolve("Hello").cloned();

        assert_eq!(reply, Some(Message::assistant("Hello")));
        assert_eq!(conversation.transcript().len(), 2);
        assert!(!conversation.is_pending());
    }

    #[test]
    fn empty_reply_uses_connection_fallback() {
        let mut conversation = Conversation::new();
        conversation.submit("hi", &persona()).unwrap();
        conversation.resolve("");

        assert_eq!(conversation.last().unwrap().text, FALLBACK_EMPTY);
        assert_eq!(FALLBACK_EMPTY, "Connection interrupted.");
        assert!(!conversation.is_pending());
    }

    #[test]
    fn failure_uses_offline_fallback() {
        let mut conversation = Conversation::new();
        conversation.submit("hi", &persona()).unwrap();
        conversation.fail(GenerateError::MissingApiKey);

        assert_eq!(conversation.last().unwrap().text, FALLBACK_OFFLINE);
        assert_eq!(FALLBACK_OFFLINE, "Neural link offline.");
        assert!(!conversation.is_pending());
    }

    #[test]
    fn every_settle_path_accepts_a_new_submission() {
        let outcomes: Vec<Result<String, GenerateError>> = vec![
            Ok("Hello".to_string()),
            Ok(String::new()),
            Err(GenerateError::Task("boom".to_string())),
        ];
        for outcome in outcomes {
            let mut conversation = Conversation::new();
            conversation.submit("one", &persona()).unwrap();
            conversation.settle(outcome);
            assert!(conversation.submit("two", &persona()).is_some());
            assert_eq!(conversation.transcript().len(), 3);
        }
    }

    #[test]
    fn settle_while_idle_changes_nothing() {
        let mut conversation = Conversation::new();
        assert!(conversation.resolve("stray").is_none());
        assert!(conversation.transcript().is_empty());
    }

    #[test]
    fn user_text_is_kept_verbatim() {
        let mut conversation = Conversation::new();
        let request = conversation.submit("  spaced out  ", &persona()).unwrap();
        assert_eq!(conversation.transcript()[0].text, "  spaced out  ");
        assert!(request.prompt.ends_with("Query:   spaced out  "));
    }
}
