use std::collections::BTreeMap;

use async_recursion::async_recursion;
use chrono::{SecondsFormat, Utc};
use dom_adapter::{DomError, DomPort, NodeDescription, NodeId};
use tracing::{debug, instrument};

use crate::errors::SnapshotError;
use crate::labels::{resolve_label, DocScope};
use crate::model::{DomSnapshot, FrameInfo, SnapshotNode, SnapshotOptions};

const INTERESTING_ATTRIBUTES: [&str; 7] = [
    "role",
    "type",
    "name",
    "title",
    "placeholder",
    "aria-label",
    "aria-describedby",
];

const FRAME_UNREADABLE: &str = "프레임 문서에 접근할 수 없습니다";

/// Capture the document under `options`.
#[instrument(skip_all, fields(root = ?options.root_selector))]
pub async fn capture(
    dom: &dyn DomPort,
    options: SnapshotOptions,
) -> Result<DomSnapshot, SnapshotError> {
    let root = match options.root_selector.as_deref() {
        Some(selector) => Some(
            dom.query(None, selector)
                .await?
                .ok_or_else(|| SnapshotError::root_not_found(selector))?,
        ),
        None => dom.body().await?,
    };

    let mut walker = Walker {
        dom,
        options: &options,
        count: 0,
        exceeded: false,
    };
    let tree = match root {
        Some(root) => walker.collect(root, 0, DocScope(None)).await?,
        None => None,
    };
    let (total_nodes, exceeded_limit) = (walker.count, walker.exceeded);
    debug!(total_nodes, exceeded_limit, "DOM 스냅샷 완료");

    Ok(DomSnapshot {
        url: dom.location().await?,
        captured_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        total_nodes,
        exceeded_limit,
        root_tag: tree.as_ref().map(|node| node.tag.clone()),
        tree,
        options,
    })
}

struct Walker<'a> {
    dom: &'a dyn DomPort,
    options: &'a SnapshotOptions,
    count: usize,
    exceeded: bool,
}

impl<'a> Walker<'a> {
    #[async_recursion]
    async fn collect(
        &mut self,
        node: NodeId,
        depth: usize,
        scope: DocScope,
    ) -> Result<Option<SnapshotNode>, SnapshotError> {
        if depth > self.options.max_depth {
            return Ok(None);
        }
        if self.count >= self.options.max_nodes {
            self.exceeded = true;
            return Ok(None);
        }

        let description = self.dom.describe(node).await?;
        if !self.options.include_hidden && description.hidden {
            return Ok(None);
        }
        self.count += 1;

        let mut out = SnapshotNode {
            tag: description.tag.to_ascii_lowercase(),
            id: description.id.clone(),
            classes: description.classes.clone(),
            ..SnapshotNode::default()
        };
        if self.options.include_attributes {
            out.attributes = interesting_attributes(&description);
        }

        let children = self.dom.children(node).await?;
        if self.options.include_text && children.is_empty() {
            let text = self.dom.text_content(node).await?;
            let text = text.trim();
            if !text.is_empty() {
                out.text = Some(self.options.truncate(text));
            }
        }
        if self.options.include_label {
            out.label = resolve_label(self.dom, scope, node, &description)
                .await?
                .map(|label| self.options.truncate(&label));
        }
        if self.options.include_frames && description.tag.eq_ignore_ascii_case("iframe") {
            let frame = self.collect_frame(node, depth).await?;
            if !frame.is_empty() {
                out.frame = Some(frame);
            }
        }

        if !children.is_empty() && self.count < self.options.max_nodes {
            for child in children {
                if let Some(child_node) = self.collect(child, depth + 1, scope).await? {
                    out.children.push(child_node);
                }
                if self.count >= self.options.max_nodes {
                    self.exceeded = true;
                    break;
                }
            }
        }

        Ok(Some(out))
    }

    /// Frame tree depth continues one level below the `iframe`.
    async fn collect_frame(&mut self, iframe: NodeId, depth: usize) -> Result<FrameInfo, SnapshotError> {
        let document = match self.dom.frame_document(iframe).await {
            Ok(document) => document,
            Err(DomError::FrameAccess(_)) => {
                return Ok(FrameInfo {
                    error: Some(FRAME_UNREADABLE.to_string()),
                    ..FrameInfo::default()
                })
            }
            Err(err) => {
                return Ok(FrameInfo {
                    error: Some(err.to_string()),
                    ..FrameInfo::default()
                })
            }
        };
        let url = Some(document.url).filter(|u| !u.is_empty());
        let Some(root) = document.root else {
            return Ok(FrameInfo {
                url,
                error: Some(FRAME_UNREADABLE.to_string()),
                tree: None,
            });
        };

        let scope = DocScope(Some(root));
        let tree = match self.dom.query(Some(root), "body").await? {
            Some(body) => self.collect(body, depth + 1, scope).await?,
            None => None,
        };
        Ok(FrameInfo {
            url,
            tree: tree.map(Box::new),
            error: None,
        })
    }
}

fn interesting_attributes(description: &NodeDescription) -> BTreeMap<String, String> {
    description
        .attributes
        .iter()
        .filter(|(name, _)| {
            INTERESTING_ATTRIBUTES.contains(&name.as_str())
                || name.starts_with("data-")
                || name.starts_with("aria-")
        })
        .cloned()
        .collect()
}
