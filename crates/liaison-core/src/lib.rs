pub mod ai;
pub mod config;
pub mod conversation;
pub mod error;
pub mod generator;
pub mod message;
pub mod persona;
pub mod widget;

// Re-export main types for convenience
pub use ai::GeminiClient;
pub use config::Config;
pub use conversation::{Conversation, Phase, FALLBACK_EMPTY, FALLBACK_OFFLINE};
pub use error::GenerateError;
pub use generator::{GenerateRequest, Generator};
pub use message::{Message, Role};
pub use persona::Persona;
pub use widget::{Liaison, PendingReply};
