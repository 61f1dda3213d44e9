use thiserror::Error;

/// Everything that can go wrong while asking the model for a reply.
///
/// None of these reach the user verbatim; the conversation collapses
/// every variant into the offline fallback.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no API key configured (set GEMINI_API_KEY or add api_key to the config file)")]
    MissingApiKey,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("generative language API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("generation task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for GenerateError {
    fn from(err: tokio::task::JoinError) -> Self {
        GenerateError::Task(err.to_string())
    }
}
