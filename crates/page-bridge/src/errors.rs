use action_grid::GridError;
use action_primitives::ActionError;
use dom_adapter::DomError;
use thiserror::Error;

/// Errors surfaced by the bridge on either side.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Unsupported action: {0}")]
    Unsupported(String),

    #[error("invalid payload for {action}: {reason}")]
    InvalidPayload { action: String, reason: String },

    #[error("bridge request {request_id} ({action}) timed out after {timeout_ms} ms")]
    Timeout {
        action: String,
        request_id: String,
        timeout_ms: u64,
    },

    #[error("bridge channel closed")]
    ChannelClosed,

    /// Failure reported by the page side, carried verbatim.
    #[error("{0}")]
    Remote(String),

    /// Handler failure with a user-facing message.
    #[error("{0}")]
    Handler(String),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    pub fn handler(message: impl Into<String>) -> Self {
        BridgeError::Handler(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_keep_the_page_message() {
        let err = BridgeError::Remote("저장 버튼을 찾을 수 없습니다".into());
        assert_eq!(err.to_string(), "저장 버튼을 찾을 수 없습니다");
    }

    #[test]
    fn unsupported_names_the_action() {
        let err = BridgeError::Unsupported("detectPageType".into());
        assert_eq!(err.to_string(), "Unsupported action: detectPageType");
    }
}
