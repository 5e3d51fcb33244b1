use rust_i18n::t;
use thiserror::Error;

use crate::service::ServiceError;

/// Everything that can go wrong while driving a lesson.
///
/// Only `Config` is fatal, and only at startup. Every other variant is shown
/// as a status line and leaves the session as it was.
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("rate limit reached: {0}")]
    Quota(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("could not read document: {0}")]
    Extraction(String),

    #[error("'{action}' is not available in state '{state}'")]
    InvalidAction {
        action: &'static str,
        state: &'static str,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ServiceError> for TutorError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Quota(msg) => TutorError::Quota(msg),
            other => TutorError::Service(other.to_string()),
        }
    }
}

impl TutorError {
    pub fn invalid(action: &'static str, state: &'static str) -> Self {
        TutorError::InvalidAction { action, state }
    }

    /// Short localized label shown ahead of the detail in the status line.
    pub fn headline(&self) -> String {
        match self {
            TutorError::Config(_) => t!("error.config"),
            TutorError::Quota(_) => t!("error.quota"),
            TutorError::Service(_) => t!("error.service"),
            TutorError::Extraction(_) => t!("error.extraction"),
            TutorError::InvalidAction { .. } => t!("error.invalid_action"),
            TutorError::Storage(_) => t!("error.storage"),
        }
        .to_string()
    }
}
