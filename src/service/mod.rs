//! Narrow contracts for the hosted services the tutor talks to. All calls are
//! blocking; the UI shows a busy overlay while one is in flight.

#[cfg(test)]
pub mod fake;
pub mod gemini;
pub mod speech;

use thiserror::Error;

use crate::tutor::transcript::Role;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rate limiting / exhausted quota. The learner should wait and retry.
    #[error("quota exhausted: {0}")]
    Quota(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("built without network support")]
    Offline,
}

/// Conversation history handed to the model alongside each new message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatContext {
    pub model: String,
    pub system_instruction: String,
    pub history: Vec<(Role, String)>,
}

pub trait LanguageModel {
    /// Continue the conversation in `context` with `message` from the learner.
    fn send(&self, context: &ChatContext, message: &str) -> Result<String, ServiceError>;

    /// Stateless one-off completion (translation, judging, scripts).
    fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

pub trait SpeechToText {
    /// Transcribe a clip. Unintelligible audio yields an empty string.
    fn transcribe(&self, audio: &[u8], mime: &str) -> Result<String, ServiceError>;
}

pub trait TextToSpeech {
    fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, ServiceError>;
}
