use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle to an element tracked by a DOM backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Vertical alignment for `scroll_into_view`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBlock {
    Start,
    Center,
    End,
    Nearest,
}

impl ScrollBlock {
    pub fn as_str(self) -> &'static str {
        match self {
            ScrollBlock::Start => "start",
            ScrollBlock::Center => "center",
            ScrollBlock::End => "end",
            ScrollBlock::Nearest => "nearest",
        }
    }
}

/// Keyboard event payload.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInput {
    pub key: String,
    pub code: String,
    pub key_code: u32,
}

impl KeyInput {
    /// Named key such as `End`, `Home`, `ArrowDown`, `Enter` or `Escape`.
    pub fn named(key: &str) -> Self {
        let key_code = match key {
            "Enter" => 13,
            "Escape" => 27,
            "End" => 35,
            "Home" => 36,
            "ArrowUp" => 38,
            "ArrowDown" => 40,
            "Tab" => 9,
            _ => 0,
        };
        Self {
            key: key.to_string(),
            code: key.to_string(),
            key_code,
        }
    }

    /// Printable character key.
    pub fn char(ch: char) -> Self {
        let code = if ch.is_ascii_alphabetic() {
            format!("Key{}", ch.to_ascii_uppercase())
        } else if ch.is_ascii_digit() {
            format!("Digit{ch}")
        } else if ch == ' ' {
            "Space".to_string()
        } else {
            String::new()
        };
        let key_code = if ch.is_ascii() {
            ch.to_ascii_uppercase() as u32
        } else {
            229
        };
        Self {
            key: ch.to_string(),
            code,
            key_code,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseKind {
    MouseDown,
    MouseUp,
    Click,
    DblClick,
}

impl MouseKind {
    pub fn event_name(self) -> &'static str {
        match self {
            MouseKind::MouseDown => "mousedown",
            MouseKind::MouseUp => "mouseup",
            MouseKind::Click => "click",
            MouseKind::DblClick => "dblclick",
        }
    }
}

/// Synthetic events dispatched on an element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DomEvent {
    Input,
    Change,
    Scroll,
    KeyDown(KeyInput),
    KeyUp(KeyInput),
    Mouse { button: MouseKind, x: f64, y: f64 },
    Wheel { delta_y: f64 },
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::Scroll => "scroll",
            DomEvent::KeyDown(_) => "keydown",
            DomEvent::KeyUp(_) => "keyup",
            DomEvent::Mouse { button, .. } => button.event_name(),
            DomEvent::Wheel { .. } => "wheel",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Scroll state of a potential scroll container.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
    /// Computed `overflow-y` value.
    pub overflow_y: String,
}

impl ScrollMetrics {
    /// `overflow-y` is `auto` or `scroll` and content overflows.
    pub fn is_scrollable(&self) -> bool {
        matches!(self.overflow_y.as_str(), "auto" | "scroll") && self.scroll_height > self.client_height
    }
}

/// Static description of an element used by the snapshot walker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescription {
    /// Upper-case tag name.
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    /// `display: none` or `visibility: hidden`.
    pub hidden: bool,
}

impl NodeDescription {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Document hosted by an `iframe`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameDocument {
    pub url: String,
    /// The frame's `documentElement`, when it has one.
    pub root: Option<NodeId>,
}

/// Handle to an object exposed by the host framework.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ComponentRef(pub u64);
