//! Error types for action primitives

use dom_adapter::DomError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// A required element is missing. Carries the user-facing message.
    #[error("{0}")]
    ElementNotFound(String),

    /// DOM backend failure
    #[error(transparent)]
    Dom(#[from] DomError),
}

impl ActionError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ActionError::ElementNotFound(message.into())
    }
}
