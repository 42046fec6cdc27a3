use thiserror::Error;

/// Failures surfaced by a DOM backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("node {0} is no longer tracked")]
    StaleNode(u64),
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("browser connection failed: {0}")]
    Connection(String),
    #[error("no page matching '{0}' is open")]
    PageNotFound(String),
    #[error("frame content is not accessible: {0}")]
    FrameAccess(String),
    #[error("component call failed: {0}")]
    Component(String),
}

impl DomError {
    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    pub fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }

    pub fn component(msg: impl Into<String>) -> Self {
        Self::Component(msg.into())
    }
}
