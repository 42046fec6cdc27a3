use async_trait::async_trait;
use serde_json::Value;

use crate::errors::DomError;
use crate::model::{
    ComponentRef, DomEvent, FrameDocument, NodeDescription, NodeId, Rect, ScrollBlock,
    ScrollMetrics,
};

/// Element-level access to one document.
///
/// Every method is a single round trip to the backend. Handles stay valid until
/// the element is garbage collected on the page side; `is_connected` tells
/// whether a handle still sits in the live tree.
#[async_trait]
pub trait DomPort: Send + Sync {
    /// First match of `selector` under `scope` (the document when `None`).
    async fn query(&self, scope: Option<NodeId>, selector: &str) -> Result<Option<NodeId>, DomError>;
    /// All matches in document order.
    async fn query_all(&self, scope: Option<NodeId>, selector: &str)
        -> Result<Vec<NodeId>, DomError>;
    async fn element_by_id(&self, id: &str) -> Result<Option<NodeId>, DomError>;
    async fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, DomError>;
    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>, DomError>;
    async fn children(&self, node: NodeId) -> Result<Vec<NodeId>, DomError>;
    async fn body(&self) -> Result<Option<NodeId>, DomError>;
    async fn document_element(&self) -> Result<Option<NodeId>, DomError>;
    async fn active_element(&self) -> Result<Option<NodeId>, DomError>;
    async fn is_connected(&self, node: NodeId) -> Result<bool, DomError>;

    async fn text_content(&self, node: NodeId) -> Result<String, DomError>;
    async fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, DomError>;
    async fn value(&self, node: NodeId) -> Result<String, DomError>;
    /// Assign the `value` property without dispatching events.
    async fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError>;
    async fn describe(&self, node: NodeId) -> Result<NodeDescription, DomError>;

    /// Native `element.click()`.
    async fn click(&self, node: NodeId) -> Result<(), DomError>;
    async fn focus(&self, node: NodeId) -> Result<(), DomError>;
    async fn blur(&self, node: NodeId) -> Result<(), DomError>;
    async fn dispatch(&self, node: NodeId, event: DomEvent) -> Result<(), DomError>;

    async fn scroll_into_view(&self, node: NodeId, block: ScrollBlock) -> Result<(), DomError>;
    async fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError>;
    async fn scroll_metrics(&self, node: NodeId) -> Result<ScrollMetrics, DomError>;
    async fn set_scroll_top(&self, node: NodeId, top: f64) -> Result<(), DomError>;

    /// Content document of an `iframe`; cross-origin frames yield `FrameAccess`.
    async fn frame_document(&self, node: NodeId) -> Result<FrameDocument, DomError>;
    async fn location(&self) -> Result<String, DomError>;
}

/// Component access to the host page's UI framework (`cpr.core.Platform`).
#[async_trait]
pub trait FrameworkPort: Send + Sync {
    /// `cpr.core.Platform.INSTANCE` exists.
    async fn platform_available(&self) -> Result<bool, DomError>;
    /// The platform object itself, usable as a lookup scope.
    async fn platform(&self) -> Result<Option<ComponentRef>, DomError>;
    /// Application registered under `app_id`.
    async fn application(&self, app_id: &str) -> Result<Option<ComponentRef>, DomError>;
    async fn active_application(&self) -> Result<Option<ComponentRef>, DomError>;
    /// `scope.lookup(id)`.
    async fn lookup(&self, scope: ComponentRef, id: &str) -> Result<Option<ComponentRef>, DomError>;
    /// Invoke a method and return its JSON result (`null` for objects).
    async fn call(
        &self,
        target: ComponentRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, DomError>;
    /// Invoke a method returning an object and track that object.
    async fn call_object(
        &self,
        target: ComponentRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Option<ComponentRef>, DomError>;
    async fn has_method(&self, target: ComponentRef, method: &str) -> Result<bool, DomError>;
    async fn set_property(&self, target: ComponentRef, name: &str, value: Value)
        -> Result<(), DomError>;
}
