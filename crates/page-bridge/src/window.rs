use nice_core_types::WindowId;
use serde_json::Value;
use tokio::sync::broadcast;

const WINDOW_CAPACITY: usize = 256;

/// One posted message: the sending window and its JSON data.
#[derive(Clone, Debug)]
pub struct WindowMessage {
    pub source: WindowId,
    pub data: Value,
}

/// A window's message channel, shared by the content and page sides.
///
/// Cloning keeps the same identity; [`Window::frame`] gives a handle that
/// posts into the same channel under a different source.
#[derive(Clone)]
pub struct Window {
    id: WindowId,
    sender: broadcast::Sender<WindowMessage>,
}

impl Window {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(WINDOW_CAPACITY);
        Self {
            id: WindowId::new(),
            sender,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Handle for a nested frame posting into this window.
    pub fn frame(&self) -> Window {
        Self {
            id: WindowId::new(),
            sender: self.sender.clone(),
        }
    }

    /// `window.postMessage(data, '*')`; silently dropped without listeners.
    pub fn post_message(&self, data: Value) {
        let _ = self.sender.send(WindowMessage {
            source: self.id,
            data,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WindowMessage> {
        self.sender.subscribe()
    }

    /// Listener filter: same window and the expected `type` tag.
    pub fn accepts(&self, message: &WindowMessage, expected_type: &str) -> bool {
        message.source == self.id && crate::protocol::message_type(&message.data) == Some(expected_type)
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}
