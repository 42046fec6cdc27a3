//! DevTools-backed DOM port.
//!
//! Attaches to an already running Chromium (`--remote-debugging-port`), picks
//! the tab showing the NEIS host and evaluates small page-side snippets for
//! every DOM call.

mod scripts;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::DomError;
use crate::model::{
    ComponentRef, DomEvent, FrameDocument, NodeDescription, NodeId, Rect, ScrollBlock,
    ScrollMetrics,
};
use crate::port::{DomPort, FrameworkPort};

const TARGET_DISCOVERY_ATTEMPTS: usize = 10;

/// Connection to a running browser.
pub struct CdpSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl CdpSession {
    /// Connect through an `http://host:port` debugger endpoint or a `ws://` URL.
    pub async fn connect(debugger_url: &str) -> Result<Self, DomError> {
        let ws_url = resolve_ws_url(debugger_url).await?;
        info!(ws_url = %ws_url, "connecting to browser");
        let (browser, mut handler) = Browser::connect(ws_url)
            .await
            .map_err(|err| DomError::Connection(err.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    warn!(error = %err, "browser handler stopped");
                    break;
                }
            }
            debug!("browser handler ended");
        });
        Ok(Self { browser, handler })
    }

    /// First tab whose URL contains `host_filter`.
    pub async fn find_page(&mut self, host_filter: &str) -> Result<Page, DomError> {
        let pages = self.matching_pages(host_filter).await?;
        pages
            .into_iter()
            .next()
            .ok_or_else(|| DomError::PageNotFound(host_filter.to_string()))
    }

    /// All tabs whose URL contains `host_filter`.
    pub async fn matching_pages(&mut self, host_filter: &str) -> Result<Vec<Page>, DomError> {
        if let Err(err) = self.browser.fetch_targets().await {
            debug!(error = %err, "target discovery failed");
        }
        for attempt in 0..TARGET_DISCOVERY_ATTEMPTS {
            let pages = self
                .browser
                .pages()
                .await
                .map_err(|err| DomError::Connection(err.to_string()))?;
            let mut matching = Vec::new();
            for page in pages {
                if let Ok(Some(url)) = page.url().await {
                    if url.contains(host_filter) {
                        matching.push(page);
                    }
                }
            }
            if !matching.is_empty() {
                return Ok(matching);
            }
            debug!(attempt, "no matching page yet");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(Vec::new())
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn resolve_ws_url(debugger_url: &str) -> Result<String, DomError> {
    if debugger_url.starts_with("ws://") || debugger_url.starts_with("wss://") {
        return Ok(debugger_url.to_string());
    }
    let base = url::Url::parse(debugger_url)
        .map_err(|err| DomError::Connection(format!("invalid debugger url: {err}")))?;
    let version = base
        .join("/json/version")
        .map_err(|err| DomError::Connection(err.to_string()))?;
    let body: Value = reqwest::get(version)
        .await
        .map_err(|err| DomError::Connection(err.to_string()))?
        .json()
        .await
        .map_err(|err| DomError::Connection(err.to_string()))?;
    body.get("webSocketDebuggerUrl")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DomError::Connection("webSocketDebuggerUrl missing".to_string()))
}

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Script runner shared by the DOM and framework ports.
#[derive(Clone)]
struct PageScript {
    page: Arc<Page>,
}

impl PageScript {
    async fn run<T: DeserializeOwned>(&self, body: &str, args: Value) -> Result<T, DomError> {
        let expression = scripts::wrap(body, &args);
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|err| DomError::script(err.to_string()))?;
        let envelope: Envelope = result
            .into_value()
            .map_err(|err| DomError::script(err.to_string()))?;
        if !envelope.ok {
            let message = envelope.error.unwrap_or_default();
            if let Some(id) = message
                .strip_prefix(scripts::STALE_PREFIX)
                .and_then(|id| id.trim().parse::<u64>().ok())
            {
                return Err(DomError::StaleNode(id));
            }
            return Err(DomError::Script(message));
        }
        serde_json::from_value(envelope.value).map_err(|err| DomError::script(err.to_string()))
    }
}

/// [`DomPort`] over one page.
#[derive(Clone)]
pub struct CdpDom {
    script: PageScript,
}

impl CdpDom {
    pub fn new(page: Page) -> Self {
        Self {
            script: PageScript {
                page: Arc::new(page),
            },
        }
    }

    pub fn page(&self) -> &Page {
        &self.script.page
    }

    /// Framework port bound to the same page.
    pub fn framework(&self) -> CdpFramework {
        CdpFramework {
            script: self.script.clone(),
        }
    }

    async fn node_op<T: DeserializeOwned>(&self, body: &str, node: NodeId) -> Result<T, DomError> {
        self.script.run(body, json!({ "id": node.0 })).await
    }
}

fn to_node(raw: Option<u64>) -> Option<NodeId> {
    raw.map(NodeId)
}

#[async_trait]
impl DomPort for CdpDom {
    async fn query(&self, scope: Option<NodeId>, selector: &str) -> Result<Option<NodeId>, DomError> {
        let raw: Option<u64> = self
            .script
            .run(
                scripts::QUERY,
                json!({ "scope": scope.map(|s| s.0), "selector": selector }),
            )
            .await?;
        Ok(to_node(raw))
    }

    async fn query_all(
        &self,
        scope: Option<NodeId>,
        selector: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        let raw: Vec<u64> = self
            .script
            .run(
                scripts::QUERY_ALL,
                json!({ "scope": scope.map(|s| s.0), "selector": selector }),
            )
            .await?;
        Ok(raw.into_iter().map(NodeId).collect())
    }

    async fn element_by_id(&self, id: &str) -> Result<Option<NodeId>, DomError> {
        let raw: Option<u64> = self.script.run(scripts::BY_ID, json!({ "id": id })).await?;
        Ok(to_node(raw))
    }

    async fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let raw: Option<u64> = self
            .script
            .run(scripts::CLOSEST, json!({ "id": node.0, "selector": selector }))
            .await?;
        Ok(to_node(raw))
    }

    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>, DomError> {
        Ok(to_node(self.node_op(scripts::PARENT, node).await?))
    }

    async fn children(&self, node: NodeId) -> Result<Vec<NodeId>, DomError> {
        let raw: Vec<u64> = self.node_op(scripts::CHILDREN, node).await?;
        Ok(raw.into_iter().map(NodeId).collect())
    }

    async fn body(&self) -> Result<Option<NodeId>, DomError> {
        Ok(to_node(self.script.run(scripts::BODY, json!({})).await?))
    }

    async fn document_element(&self) -> Result<Option<NodeId>, DomError> {
        Ok(to_node(
            self.script.run(scripts::DOCUMENT_ELEMENT, json!({})).await?,
        ))
    }

    async fn active_element(&self) -> Result<Option<NodeId>, DomError> {
        Ok(to_node(self.script.run(scripts::ACTIVE, json!({})).await?))
    }

    async fn is_connected(&self, node: NodeId) -> Result<bool, DomError> {
        match self.node_op(scripts::IS_CONNECTED, node).await {
            Err(DomError::StaleNode(_)) => Ok(false),
            other => other,
        }
    }

    async fn text_content(&self, node: NodeId) -> Result<String, DomError> {
        self.node_op(scripts::TEXT, node).await
    }

    async fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, DomError> {
        self.script
            .run(scripts::ATTRIBUTE, json!({ "id": node.0, "name": name }))
            .await
    }

    async fn value(&self, node: NodeId) -> Result<String, DomError> {
        self.node_op(scripts::VALUE, node).await
    }

    async fn set_value(&self, node: NodeId, value: &str) -> Result<(), DomError> {
        self.script
            .run(scripts::SET_VALUE, json!({ "id": node.0, "value": value }))
            .await
    }

    async fn describe(&self, node: NodeId) -> Result<NodeDescription, DomError> {
        self.node_op(scripts::DESCRIBE, node).await
    }

    async fn click(&self, node: NodeId) -> Result<(), DomError> {
        self.node_op(scripts::CLICK, node).await
    }

    async fn focus(&self, node: NodeId) -> Result<(), DomError> {
        self.node_op(scripts::FOCUS, node).await
    }

    async fn blur(&self, node: NodeId) -> Result<(), DomError> {
        self.node_op(scripts::BLUR, node).await
    }

    async fn dispatch(&self, node: NodeId, event: DomEvent) -> Result<(), DomError> {
        self.script
            .run(scripts::DISPATCH, json!({ "id": node.0, "event": event }))
            .await
    }

    async fn scroll_into_view(&self, node: NodeId, block: ScrollBlock) -> Result<(), DomError> {
        self.script
            .run(
                scripts::SCROLL_INTO_VIEW,
                json!({ "id": node.0, "block": block.as_str() }),
            )
            .await
    }

    async fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError> {
        self.node_op(scripts::RECT, node).await
    }

    async fn scroll_metrics(&self, node: NodeId) -> Result<ScrollMetrics, DomError> {
        self.node_op(scripts::SCROLL_METRICS, node).await
    }

    async fn set_scroll_top(&self, node: NodeId, top: f64) -> Result<(), DomError> {
        self.script
            .run(scripts::SET_SCROLL_TOP, json!({ "id": node.0, "top": top }))
            .await
    }

    async fn frame_document(&self, node: NodeId) -> Result<FrameDocument, DomError> {
        #[derive(Deserialize)]
        struct RawFrame {
            url: String,
            #[serde(default)]
            root: Option<u64>,
            #[serde(default)]
            error: Option<String>,
        }

        let raw: RawFrame = self.node_op(scripts::FRAME_DOCUMENT, node).await?;
        if let Some(error) = raw.error {
            return Err(DomError::FrameAccess(error));
        }
        Ok(FrameDocument {
            url: raw.url,
            root: to_node(raw.root),
        })
    }

    async fn location(&self) -> Result<String, DomError> {
        self.script.run(scripts::LOCATION, json!({})).await
    }
}

/// [`FrameworkPort`] over one page.
#[derive(Clone)]
pub struct CdpFramework {
    script: PageScript,
}

fn to_component(raw: Option<u64>) -> Option<ComponentRef> {
    raw.map(ComponentRef)
}

#[async_trait]
impl FrameworkPort for CdpFramework {
    async fn platform_available(&self) -> Result<bool, DomError> {
        self.script.run(scripts::PLATFORM_AVAILABLE, json!({})).await
    }

    async fn platform(&self) -> Result<Option<ComponentRef>, DomError> {
        Ok(to_component(
            self.script.run(scripts::PLATFORM, json!({})).await?,
        ))
    }

    async fn application(&self, app_id: &str) -> Result<Option<ComponentRef>, DomError> {
        Ok(to_component(
            self.script
                .run(scripts::APPLICATION, json!({ "appId": app_id }))
                .await?,
        ))
    }

    async fn active_application(&self) -> Result<Option<ComponentRef>, DomError> {
        Ok(to_component(
            self.script.run(scripts::ACTIVE_APPLICATION, json!({})).await?,
        ))
    }

    async fn lookup(&self, scope: ComponentRef, id: &str) -> Result<Option<ComponentRef>, DomError> {
        Ok(to_component(
            self.script
                .run(scripts::LOOKUP, json!({ "scope": scope.0, "id": id }))
                .await?,
        ))
    }

    async fn call(
        &self,
        target: ComponentRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, DomError> {
        self.script
            .run(
                scripts::CALL,
                json!({ "target": target.0, "method": method, "args": args }),
            )
            .await
            .map_err(|err| DomError::component(err.to_string()))
    }

    async fn call_object(
        &self,
        target: ComponentRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Option<ComponentRef>, DomError> {
        let raw: Option<u64> = self
            .script
            .run(
                scripts::CALL_OBJECT,
                json!({ "target": target.0, "method": method, "args": args }),
            )
            .await
            .map_err(|err| DomError::component(err.to_string()))?;
        Ok(to_component(raw))
    }

    async fn has_method(&self, target: ComponentRef, method: &str) -> Result<bool, DomError> {
        self.script
            .run(
                scripts::HAS_METHOD,
                json!({ "target": target.0, "method": method }),
            )
            .await
    }

    async fn set_property(
        &self,
        target: ComponentRef,
        name: &str,
        value: Value,
    ) -> Result<(), DomError> {
        self.script
            .run(
                scripts::SET_PROPERTY,
                json!({ "target": target.0, "name": name, "value": value }),
            )
            .await
    }
}
