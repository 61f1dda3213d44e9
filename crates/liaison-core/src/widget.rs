//! The liaison widget: one conversation wired to one generator.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::conversation::Conversation;
use crate::error::GenerateError;
use crate::generator::{GenerateRequest, Generator};
use crate::message::Message;
use crate::persona::Persona;

/// A generation running on the tokio runtime.
pub struct PendingReply {
    handle: JoinHandle<Result<String, GenerateError>>,
}

impl PendingReply {
    fn spawn(generator: Arc<dyn Generator>, request: GenerateRequest) -> Self {
        let handle = tokio::spawn(async move { generator.generate(&request).await });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the reply. A panicked task comes back as an error.
    pub async fn wait(self) -> Result<String, GenerateError> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => Err(err.into()),
        }
    }
}

pub struct Liaison {
    conversation: Conversation,
    persona: Persona,
    generator: Arc<dyn Generator>,
}

impl Liaison {
    pub fn new(persona: Persona, generator: Arc<dyn Generator>) -> Self {
        Self {
            conversation: Conversation::with_greeting(&persona),
            persona,
            generator,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn transcript(&self) -> &[Message] {
        self.conversation.transcript()
    }

    pub fn is_pending(&self) -> bool {
        self.conversation.is_pending()
    }

    /// Submit `text` and start the request in the background. `None` when
    /// the submission was dropped.
    pub fn begin(&mut self, text: &str) -> Option<PendingReply> {
        let request = self.conversation.submit(text, &self.persona)?;
        Some(self.dispatch(request))
    }

    /// Same as [`Liaison::begin`], using the conversation's draft.
    pub fn begin_draft(&mut self) -> Option<PendingReply> {
        let request = self.conversation.submit_draft(&self.persona)?;
        Some(self.dispatch(request))
    }

    fn dispatch(&self, request: GenerateRequest) -> PendingReply {
        info!(prompt_chars = request.prompt.chars().count(), "sending query");
        PendingReply::spawn(Arc::clone(&self.generator), request)
    }

    pub fn finish(&mut self, outcome: Result<String, GenerateError>) -> Option<&Message> {
        self.conversation.settle(outcome)
    }

    /// Run one full exchange. Returns false if the submission was dropped.
    pub async fn send(&mut self, text: &str) -> bool {
        let Some(pending) = self.begin(text) else {
            return false;
        };
        let outcome = pending.wait().await;
        self.finish(outcome);
        true
    }
}
