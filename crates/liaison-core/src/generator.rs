use async_trait::async_trait;

use crate::error::GenerateError;

/// One outbound exchange: a composed prompt plus the system instruction.
///
/// Built by the conversation on a successful submit. Carries no history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system_instruction: String,
}

/// Something that turns a prompt into reply text.
///
/// An empty `Ok` is a valid answer; the conversation decides what to show
/// for it.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, GenerateError>;
}
