//! Accessible label resolution.

use dom_adapter::{DomError, DomPort, NodeDescription, NodeId};

const LABEL_ANCESTOR_DEPTH: usize = 3;

/// Where id lookups happen: the main document, or a frame's root element.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DocScope(pub Option<NodeId>);

impl DocScope {
    async fn by_id(&self, dom: &dyn DomPort, id: &str) -> Result<Option<NodeId>, DomError> {
        match self.0 {
            None => dom.element_by_id(id).await,
            Some(root) => dom.query(Some(root), &format!("[id=\"{}\"]", escape(id))).await,
        }
    }

    async fn label_for(&self, dom: &dyn DomPort, id: &str) -> Result<Option<NodeId>, DomError> {
        dom.query(self.0, &format!("label[for=\"{}\"]", escape(id))).await
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

async fn trimmed_text(dom: &dyn DomPort, node: NodeId) -> Result<Option<String>, DomError> {
    let text = dom.text_content(node).await?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// `aria-label`, then `aria-labelledby` targets, then `label[for]`, then a
/// `LABEL` ancestor at most three levels up.
pub(crate) async fn resolve_label(
    dom: &dyn DomPort,
    scope: DocScope,
    node: NodeId,
    description: &NodeDescription,
) -> Result<Option<String>, DomError> {
    if let Some(aria) = description.attribute("aria-label").filter(|v| !v.is_empty()) {
        let aria = aria.trim();
        return Ok((!aria.is_empty()).then(|| aria.to_string()));
    }

    if let Some(ids) = description.attribute("aria-labelledby") {
        for id in ids.split_whitespace() {
            if let Some(target) = scope.by_id(dom, id).await? {
                if let Some(text) = trimmed_text(dom, target).await? {
                    return Ok(Some(text));
                }
            }
        }
    }

    if let Some(id) = description.id.as_deref() {
        if let Some(label) = scope.label_for(dom, id).await? {
            if let Some(text) = trimmed_text(dom, label).await? {
                return Ok(Some(text));
            }
        }
    }

    let mut current = dom.parent(node).await?;
    for _ in 0..LABEL_ANCESTOR_DEPTH {
        let Some(parent) = current else { break };
        if dom.describe(parent).await?.tag.eq_ignore_ascii_case("label") {
            return trimmed_text(dom, parent).await;
        }
        current = dom.parent(parent).await?;
    }
    Ok(None)
}
