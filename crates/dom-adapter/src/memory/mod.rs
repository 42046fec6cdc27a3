//! In-memory document used by tests and dry runs.
//!
//! The tree is a flat arena of elements addressed by [`NodeId`]. Every call is
//! recorded so tests can assert on the exact interaction sequence, and an
//! optional reactor lets a test emulate how the host page responds to clicks,
//! keys and scrolling.

mod framework;

pub use framework::{MemoryComponent, MemoryFramework, MethodResult};

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use scraper::{Html, Selector};

use crate::errors::DomError;
use crate::model::{
    DomEvent, FrameDocument, NodeDescription, NodeId, Rect, ScrollBlock, ScrollMetrics,
};
use crate::port::DomPort;

/// Attribute carrying the arena id through the markup handed to the matcher.
const NODE_ATTR: &str = "data-nice-node";

/// One recorded interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum Interaction {
    NativeClick,
    Focus,
    Blur,
    SetValue(String),
    ScrollIntoView(ScrollBlock),
    SetScrollTop(f64),
    Event(DomEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Recorded {
    pub node: NodeId,
    pub interaction: Interaction,
}

impl Recorded {
    /// Event name as the page would see it (`click`, `input`, `keydown`, ...).
    pub fn name(&self) -> &'static str {
        match &self.interaction {
            Interaction::NativeClick => "click",
            Interaction::Focus => "focus",
            Interaction::Blur => "blur",
            Interaction::SetValue(_) => "value",
            Interaction::ScrollIntoView(_) => "scrollIntoView",
            Interaction::SetScrollTop(_) => "scrollTop",
            Interaction::Event(event) => event.name(),
        }
    }
}

/// Declarative element description for building test documents.
#[derive(Clone, Debug, Default)]
pub struct ElementSpec {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    value: String,
    rect: Rect,
    scroll: Option<ScrollMetrics>,
    children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.retain(|(k, _)| k != name);
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(mut self, class: &str) -> Self {
        let existing = self
            .attrs
            .iter()
            .find(|(k, _)| k == "class")
            .map(|(_, v)| v.clone());
        let merged = match existing {
            Some(current) if !current.is_empty() => format!("{current} {class}"),
            _ => class.to_string(),
        };
        self.attr("class", &merged)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect {
            x,
            y,
            width,
            height,
        };
        self
    }

    pub fn scrollable(mut self, scroll_height: f64, client_height: f64) -> Self {
        self.scroll = Some(ScrollMetrics {
            scroll_top: 0.0,
            scroll_height,
            client_height,
            overflow_y: "auto".to_string(),
        });
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ElementSpec>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Clone, Debug)]
struct MemoryFrame {
    url: String,
    root: Option<NodeId>,
    cross_origin: bool,
}

#[derive(Clone, Debug)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    value: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Rect,
    scroll: ScrollMetrics,
    frame: Option<MemoryFrame>,
    frame_root: bool,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            text: String::new(),
            value: String::new(),
            parent: None,
            children: Vec::new(),
            rect: Rect::default(),
            scroll: ScrollMetrics {
                overflow_y: "visible".to_string(),
                ..ScrollMetrics::default()
            },
            frame: None,
            frame_root: false,
        }
    }

    fn hidden(&self) -> bool {
        let Some(style) = self.attr("style") else {
            return false;
        };
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

struct Tree {
    nodes: Vec<NodeData>,
    active: Option<NodeId>,
    log: Vec<Recorded>,
    location: String,
}

const ROOT: NodeId = NodeId(0);
const BODY: NodeId = NodeId(1);

impl Tree {
    fn new(location: &str) -> Self {
        let mut html = NodeData::new("html");
        html.children.push(BODY);
        let mut body = NodeData::new("body");
        body.parent = Some(ROOT);
        Self {
            nodes: vec![html, body],
            active: None,
            log: Vec::new(),
            location: location.to_string(),
        }
    }

    fn get(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.nodes.get(id.0 as usize).ok_or(DomError::StaleNode(id.0))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(DomError::StaleNode(id.0))
    }

    fn insert(&mut self, parent: Option<NodeId>, spec: ElementSpec) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        let mut data = NodeData::new(&spec.tag);
        data.attrs = spec.attrs;
        data.text = spec.text;
        data.value = spec.value;
        data.rect = spec.rect;
        if let Some(scroll) = spec.scroll {
            data.scroll = scroll;
        }
        data.parent = parent;
        self.nodes.push(data);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent.0 as usize) {
                p.children.push(id);
            }
        }
        for child in spec.children {
            self.insert(Some(id), child);
        }
        id
    }

    fn descendants(&self, scope: NodeId, include_self: bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            if id != scope || include_self {
                out.push(id);
            }
            if let Some(node) = self.nodes.get(id.0 as usize) {
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    /// Markup for the document rooted at `root`, every element tagged with its id.
    ///
    /// Detached subtrees are wrapped in a bare `<html><body>` so the parser keeps
    /// them intact; the wrapper carries no id and never shows up in results.
    fn markup(&self, root: NodeId) -> String {
        let (open, close) = match self.nodes.get(root.0 as usize).map(|n| n.tag.as_str()) {
            Some("html") => ("", ""),
            Some("body") => ("<html>", "</html>"),
            _ => ("<html><body>", "</body></html>"),
        };
        let mut out = String::from(open);
        self.write_element(root, &mut out);
        out.push_str(close);
        out
    }

    fn write_element(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0 as usize) else {
            return;
        };
        out.push_str(&format!("<{} {NODE_ATTR}=\"{}\"", node.tag, id.0));
        for (name, value) in &node.attrs {
            out.push_str(&format!(" {name}=\"{}\"", escape_attr(value)));
        }
        out.push('>');
        for child in &node.children {
            self.write_element(*child, out);
        }
        out.push_str(&format!("</{}>", node.tag));
    }

    /// Elements of the document rooted at `root` matching `selector`, in document order.
    fn matching(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        let document = Html::parse_document(&self.markup(root));
        let ids = document
            .select(selector)
            .filter_map(|el| el.value().attr(NODE_ATTR))
            .filter_map(|id| id.parse().ok())
            .map(NodeId)
            .collect();
        ids
    }

    fn document_root(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let data = self.nodes.get(current.0 as usize)?;
            match data.parent {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
    }

    fn is_connected(&self, node: NodeId) -> bool {
        match self.document_root(node) {
            Some(ROOT) => true,
            Some(root) => self
                .nodes
                .get(root.0 as usize)
                .map(|n| n.frame_root)
                .unwrap_or(false),
            None => false,
        }
    }

    fn text_content(&self, node: NodeId) -> String {
        self.descendants(node, true)
            .into_iter()
            .filter_map(|id| self.nodes.get(id.0 as usize))
            .map(|n| n.text.as_str())
            .collect()
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn compile(selector: &str) -> Result<Selector, DomError> {
    Selector::parse(selector).map_err(|e| DomError::invalid_selector(selector, e.to_string()))
}

pub type Reactor = Arc<dyn Fn(&MemoryDom, &Recorded) + Send + Sync>;

/// In-memory [`DomPort`] implementation.
#[derive(Clone)]
pub struct MemoryDom {
    tree: Arc<Mutex<Tree>>,
    reactor: Arc<RwLock<Option<Reactor>>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::with_location("about:blank")
    }

    pub fn with_location(location: &str) -> Self {
        Self {
            tree: Arc::new(Mutex::new(Tree::new(location))),
            reactor: Arc::new(RwLock::new(None)),
        }
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn body_id(&self) -> NodeId {
        BODY
    }

    /// Append `spec` (and its children) under `parent`.
    pub fn append(&self, parent: NodeId, spec: ElementSpec) -> NodeId {
        self.tree.lock().insert(Some(parent), spec)
    }

    /// Append under `<body>`.
    pub fn append_to_body(&self, spec: ElementSpec) -> NodeId {
        self.append(BODY, spec)
    }

    /// Detach `node` from its parent; it stays addressable but disconnected.
    pub fn remove(&self, node: NodeId) {
        let mut tree = self.tree.lock();
        let parent = tree.nodes.get(node.0 as usize).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = tree.nodes.get_mut(parent.0 as usize) {
                p.children.retain(|c| *c != node);
            }
        }
        if let Some(n) = tree.nodes.get_mut(node.0 as usize) {
            n.parent = None;
        }
    }

    /// Remove every child of `node`.
    pub fn clear_children(&self, node: NodeId) {
        let children = self
            .tree
            .lock()
            .nodes
            .get(node.0 as usize)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            self.remove(child);
        }
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        let mut tree = self.tree.lock();
        if let Some(n) = tree.nodes.get_mut(node.0 as usize) {
            n.attrs.retain(|(k, _)| k != name);
            n.attrs.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove_attr(&self, node: NodeId, name: &str) {
        let mut tree = self.tree.lock();
        if let Some(n) = tree.nodes.get_mut(node.0 as usize) {
            n.attrs.retain(|(k, _)| k != name);
        }
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        if let Some(n) = self.tree.lock().nodes.get_mut(node.0 as usize) {
            n.text = text.to_string();
        }
    }

    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        if let Some(n) = self.tree.lock().nodes.get_mut(node.0 as usize) {
            n.rect = rect;
        }
    }

    /// Attach a same-origin document to an `iframe` element.
    pub fn attach_frame(&self, iframe: NodeId, url: &str, root: ElementSpec) -> NodeId {
        let mut tree = self.tree.lock();
        let root_id = tree.insert(None, root);
        if let Some(n) = tree.nodes.get_mut(root_id.0 as usize) {
            n.frame_root = true;
        }
        if let Some(n) = tree.nodes.get_mut(iframe.0 as usize) {
            n.frame = Some(MemoryFrame {
                url: url.to_string(),
                root: Some(root_id),
                cross_origin: false,
            });
        }
        root_id
    }

    /// Mark an `iframe` as cross-origin: its document cannot be read.
    pub fn block_frame(&self, iframe: NodeId, url: &str) {
        if let Some(n) = self.tree.lock().nodes.get_mut(iframe.0 as usize) {
            n.frame = Some(MemoryFrame {
                url: url.to_string(),
                root: None,
                cross_origin: true,
            });
        }
    }

    pub fn set_active(&self, node: Option<NodeId>) {
        self.tree.lock().active = node;
    }

    /// Install the page behaviour hook, replacing any previous one.
    pub fn set_reactor<F>(&self, reactor: F)
    where
        F: Fn(&MemoryDom, &Recorded) + Send + Sync + 'static,
    {
        *self.reactor.write() = Some(Arc::new(reactor));
    }

    pub fn log(&self) -> Vec<Recorded> {
        self.tree.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.tree.lock().log.clear();
    }

    /// Recorded interaction names for one node, in order.
    pub fn names_for(&self, node: NodeId) -> Vec<&'static str> {
        self.tree
            .lock()
            .log
            .iter()
            .filter(|r| r.node == node)
            .map(|r| r.name())
            .collect()
    }

    /// Synchronous query used by reactors and test setup.
    pub fn find(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.find_all(selector)?.into_iter().next())
    }

    pub fn find_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        self.select(None, selector)
    }

    pub fn value_of(&self, node: NodeId) -> String {
        self.tree
            .lock()
            .nodes
            .get(node.0 as usize)
            .map(|n| n.value.clone())
            .unwrap_or_default()
    }

    pub fn attr_of(&self, node: NodeId, name: &str) -> Option<String> {
        self.tree
            .lock()
            .nodes
            .get(node.0 as usize)
            .and_then(|n| n.attr(name).map(str::to_string))
    }

    pub fn scroll_top_of(&self, node: NodeId) -> f64 {
        self.tree
            .lock()
            .nodes
            .get(node.0 as usize)
            .map(|n| n.scroll.scroll_top)
            .unwrap_or_default()
    }

    fn record(&self, node: NodeId, interaction: Interaction) {
        let entry = Recorded { node, interaction };
        self.tree.lock().log.push(entry.clone());
        let reactor = self.reactor.read().clone();
        if let Some(reactor) = reactor {
            reactor(self, &entry);
        }
    }

    fn with_node<T>(&self, node: NodeId, f: impl FnOnce(&NodeData) -> T) -> Result<T, DomError> {
        let tree = self.tree.lock();
        tree.get(node).map(f)
    }

    fn select(&self, scope: Option<NodeId>, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = compile(selector)?;
        let tree = self.tree.lock();
        let Some(scope) = scope else {
            return Ok(tree.matching(ROOT, &selector));
        };
        tree.get(scope)?;
        let root = tree.document_root(scope).unwrap_or(scope);
        let within: HashSet<NodeId> = tree.descendants(scope, false).into_iter().collect();
        Ok(tree
            .matching(root, &selector)
            .into_iter()
            .filter(|id| within.contains(id))
            .collect())
    }
}

#[async_trait]
impl DomPort for MemoryDom {
    async fn query(&self, scope: Option<NodeId>, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.select(scope, selector)?.into_iter().next())
    }

    async fn query_all(
        &self,
        scope: Option<NodeId>,
        selector: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        self.select(scope, selector)
    }

    async fn element_by_id(&self, id: &str) -> Result<Option<NodeId>, DomError> {
        let tree = self.tree.lock();
        Ok(tree
            .descendants(ROOT, true)
            .into_iter()
            .find(|n| tree.nodes[n.0 as usize].attr("id") == Some(id)))
    }

    async fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = compile(selector)?;
        let tree = self.tree.lock();
        tree.get(node)?;
        let root = tree.document_root(node).unwrap_or(node);
        let matched: HashSet<NodeId> = tree.matching(root, &selector).into_iter().collect();
        let mut current = Some(node);
        while let Some(id) = current {
            if matched.contains(&id) {
                return Ok(Some(id));
            }
            current = tree.get(id)?.parent;
        }
        Ok(None)
    }

    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>, DomError> {
        self.with_node(node, |n| n.parent)
    }

    async fn children(&self, node: NodeId) -> Result<Vec<NodeId>, DomError> {
        self.with_node(node, |n| n.children.clone())
    }

    async fn body(&self) -> Result<Option<NodeId>, DomError> {
        Ok(Some(BODY))
    }

    async fn document_element(&self) -> Result<Option<NodeId>, DomError> {
        Ok(Some(ROOT))
    }

    async fn active_element(&self) -> Result<Option<NodeId>, DomError> {
        Ok(Some(self.tree.lock().active.unwrap_or(BODY)))
    }

    async fn is_connected(&self, node: NodeId) -> Result<bool, DomError> {
        Ok(self.tree.lock().is_connected(node))
    }

    async fn text_content(&self, node: NodeId) -> Result<String, DomError> {
        let tree = self.tree.lock();
        tree.get(node)?;
        Ok(tree.text_content(node))
    }

    async fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, DomError> {
        self.with_node(node, |n| n.attr(name).map(str::to_string))
    }

    async fn value(&self, node: NodeId) -> Result<String, DomError> {
        self.with_node(node, |n| n.value.clone())
    }

    async fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError> {
        self.tree.lock().get_mut(node)?.value = value.to_string();
        self.record(node, Interaction::SetValue(value.to_string()));
        Ok(())
    }

    async fn describe(&self, node: NodeId) -> Result<NodeDescription, DomError> {
        self.with_node(node, |n| NodeDescription {
            tag: n.tag.to_ascii_uppercase(),
            id: n.attr("id").filter(|v| !v.is_empty()).map(str::to_string),
            classes: n
                .attr("class")
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            attributes: n.attrs.clone(),
            hidden: n.hidden(),
        })
    }

    async fn click(&self, node: NodeId) -> Result<(), DomError> {
        self.with_node(node, |_| ())?;
        self.record(node, Interaction::NativeClick);
        Ok(())
    }

    async fn focus(&self, node: NodeId) -> Result<(), DomError> {
        self.with_node(node, |_| ())?;
        self.tree.lock().active = Some(node);
        self.record(node, Interaction::Focus);
        Ok(())
    }

    async fn blur(&self, node: NodeId) -> Result<(), DomError> {
        self.with_node(node, |_| ())?;
        {
            let mut tree = self.tree.lock();
            if tree.active == Some(node) {
                tree.active = None;
            }
        }
        self.record(node, Interaction::Blur);
        Ok(())
    }

    async fn dispatch(&self, node: NodeId, event: DomEvent) -> Result<(), DomError> {
        self.with_node(node, |_| ())?;
        self.record(node, Interaction::Event(event));
        Ok(())
    }

    async fn scroll_into_view(&self, node: NodeId, block: ScrollBlock) -> Result<(), DomError> {
        self.with_node(node, |_| ())?;
        self.record(node, Interaction::ScrollIntoView(block));
        Ok(())
    }

    async fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError> {
        self.with_node(node, |n| n.rect)
    }

    async fn scroll_metrics(&self, node: NodeId) -> Result<ScrollMetrics, DomError> {
        self.with_node(node, |n| n.scroll.clone())
    }

    async fn set_scroll_top(&self, node: NodeId, top: f64) -> Result<(), DomError> {
        {
            let mut tree = self.tree.lock();
            let scroll = &mut tree.get_mut(node)?.scroll;
            let max = (scroll.scroll_height - scroll.client_height).max(0.0);
            scroll.scroll_top = top.clamp(0.0, max);
        }
        self.record(node, Interaction::SetScrollTop(top));
        Ok(())
    }

    async fn frame_document(&self, node: NodeId) -> Result<FrameDocument, DomError> {
        let frame = self.with_node(node, |n| n.frame.clone())?;
        match frame {
            Some(frame) if frame.cross_origin => Err(DomError::FrameAccess(format!(
                "Blocked a frame with origin from accessing {}",
                frame.url
            ))),
            Some(frame) => Ok(FrameDocument {
                url: frame.url,
                root: frame.root,
            }),
            None => Ok(FrameDocument {
                url: "about:blank".to_string(),
                root: None,
            }),
        }
    }

    async fn location(&self) -> Result<String, DomError> {
        Ok(self.tree.lock().location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_dom() -> (MemoryDom, NodeId) {
        let dom = MemoryDom::new();
        let grid = dom.append_to_body(
            ElementSpec::new("div").attr("role", "grid").children((3..=5).map(|m| {
                ElementSpec::new("div").attr("role", "row").child(
                    ElementSpec::new("div")
                        .attr("role", "gridcell")
                        .attr("aria-label", &format!("{m}행 월 {m}"))
                        .text(&m.to_string()),
                )
            })),
        );
        (dom, grid)
    }

    #[tokio::test]
    async fn queries_follow_document_order() {
        let (dom, grid) = grid_dom();
        let rows = dom.query_all(Some(grid), r#"[role="row"]"#).await.unwrap();
        assert_eq!(rows.len(), 3);
        let texts: Vec<String> = futures::future::try_join_all(
            rows.iter().map(|r| dom.text_content(*r)),
        )
        .await
        .unwrap();
        assert_eq!(texts, vec!["3", "4", "5"]);

        let cell = dom
            .query(None, r#"[role="grid"] > [role="row"] [aria-label*="월 "]"#)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dom.closest(cell, r#"[role="row"]"#).await.unwrap(), Some(rows[0]));
    }

    #[tokio::test]
    async fn removed_nodes_are_disconnected() {
        let (dom, grid) = grid_dom();
        let row = dom.query(Some(grid), r#"[role="row"]"#).await.unwrap().unwrap();
        assert!(dom.is_connected(row).await.unwrap());
        dom.remove(row);
        assert!(!dom.is_connected(row).await.unwrap());
        assert_eq!(dom.query_all(Some(grid), r#"[role="row"]"#).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn structural_and_sibling_selectors_match() {
        let dom = MemoryDom::new();
        let form = dom.append_to_body(ElementSpec::new("div").id("form").children([
            ElementSpec::new("label").text("목표"),
            ElementSpec::new("textarea").class("x"),
            ElementSpec::new("textarea"),
            ElementSpec::new("textarea").class("x"),
        ]));
        let areas = dom.find_all("textarea").unwrap();
        assert_eq!(areas.len(), 3);

        assert_eq!(dom.find_all("textarea:last-of-type").unwrap(), vec![areas[2]]);
        assert_eq!(dom.find_all("textarea:not(.x)").unwrap(), vec![areas[1]]);
        assert_eq!(dom.find_all("label ~ textarea").unwrap(), areas);
        assert_eq!(dom.find_all("label + textarea").unwrap(), vec![areas[0]]);
        assert_eq!(
            dom.query_all(Some(form), "textarea.x:nth-child(2)").await.unwrap(),
            vec![areas[0]]
        );
    }

    #[tokio::test]
    async fn quoted_values_and_lists_keep_document_order() {
        let (dom, grid) = grid_dom();
        let cells = dom
            .query_all(None, r#"[role="gridcell"][aria-label*="월 "]"#)
            .await
            .unwrap();
        assert_eq!(cells.len(), 3);

        let mixed = dom
            .query_all(None, r#"[role="gridcell"], [role="grid"]"#)
            .await
            .unwrap();
        assert_eq!(mixed[0], grid);
        assert_eq!(&mixed[1..], cells.as_slice());

        dom.set_attr(cells[1], "aria-label", r#"4행 "월" & <4>"#);
        let quoted = dom
            .query(None, r#"[aria-label='4행 "월" & <4>']"#)
            .await
            .unwrap();
        assert_eq!(quoted, Some(cells[1]));
    }

    #[tokio::test]
    async fn malformed_selectors_are_errors() {
        let (dom, grid) = grid_dom();
        for selector in ["", "div >", "[[role]", ":no-such-pseudo"] {
            let err = dom.query_all(None, selector).await.unwrap_err();
            assert!(
                matches!(err, DomError::InvalidSelector { .. }),
                "{selector}: {err:?}"
            );
            assert!(dom.find_all(selector).is_err());
            assert!(dom.closest(grid, selector).await.is_err());
        }
    }

    #[tokio::test]
    async fn frame_documents_are_queried_on_their_own() {
        let dom = MemoryDom::new();
        let iframe = dom.append_to_body(ElementSpec::new("iframe"));
        let frame_body = dom.attach_frame(
            iframe,
            "https://dge.neis.go.kr/frame",
            ElementSpec::new("body").child(ElementSpec::new("div").child(ElementSpec::new("textarea"))),
        );
        assert!(dom.find_all("textarea").unwrap().is_empty());

        let area = dom
            .query(Some(frame_body), "body > div > textarea")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dom.closest(area, "body").await.unwrap(), Some(frame_body));
    }

    #[tokio::test]
    async fn detached_subtrees_can_still_be_scoped() {
        let (dom, grid) = grid_dom();
        let row = dom.query(Some(grid), r#"[role="row"]"#).await.unwrap().unwrap();
        dom.remove(row);
        let cell = dom.query(Some(row), r#"[role="gridcell"]"#).await.unwrap();
        assert!(cell.is_some());
        assert_eq!(dom.closest(cell.unwrap(), r#"[role="row"]"#).await.unwrap(), Some(row));
        assert_eq!(dom.query(Some(row), r#"[role="row"]"#).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reactor_sees_interactions() {
        let dom = MemoryDom::new();
        let button = dom.append_to_body(ElementSpec::new("div").attr("title", "행추가"));
        dom.set_reactor(move |dom, rec| {
            if rec.node == button && rec.name() == "click" {
                dom.append_to_body(ElementSpec::new("div").attr("role", "row"));
            }
        });
        dom.click(button).await.unwrap();
        assert!(dom.find(r#"[role="row"]"#).unwrap().is_some());
        assert_eq!(dom.names_for(button), vec!["click"]);
    }

    #[tokio::test]
    async fn focus_tracks_active_element() {
        let dom = MemoryDom::new();
        let area = dom.append_to_body(ElementSpec::new("textarea"));
        assert_eq!(dom.active_element().await.unwrap(), Some(dom.body_id()));
        dom.focus(area).await.unwrap();
        assert_eq!(dom.active_element().await.unwrap(), Some(area));
        dom.blur(area).await.unwrap();
        assert_eq!(dom.active_element().await.unwrap(), Some(dom.body_id()));
    }
}
