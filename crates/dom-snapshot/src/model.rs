use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What to include in a snapshot. Missing fields take the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotOptions {
    pub max_depth: usize,
    pub include_text: bool,
    pub include_attributes: bool,
    pub include_label: bool,
    pub include_frames: bool,
    pub max_nodes: usize,
    pub text_max_length: usize,
    pub include_hidden: bool,
    pub root_selector: Option<String>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            max_depth: 8,
            include_text: true,
            include_attributes: true,
            include_label: true,
            include_frames: true,
            max_nodes: 4000,
            text_max_length: 400,
            include_hidden: true,
            root_selector: None,
        }
    }
}

impl SnapshotOptions {
    /// Cut `text` to `text_max_length` characters, marking the cut with `…`.
    pub fn truncate(&self, text: &str) -> String {
        if text.chars().count() <= self.text_max_length {
            return text.to_string();
        }
        let mut cut: String = text.chars().take(self.text_max_length).collect();
        cut.push('…');
        cut
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

/// Content of an `iframe`: its tree, or why it could not be read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<Box<SnapshotNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameInfo {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.tree.is_none() && self.error.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshot {
    pub url: String,
    /// RFC 3339, millisecond precision.
    pub captured_at: String,
    pub total_nodes: usize,
    pub exceeded_limit: bool,
    pub options: SnapshotOptions,
    pub root_tag: Option<String>,
    pub tree: Option<SnapshotNode>,
}
