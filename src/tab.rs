//! Tab messaging with content-script re-injection.

use std::sync::Arc;

use async_trait::async_trait;
use nice_core_types::TabId;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::content::{ContentRuntime, PageHandles, RuntimeEnv, RuntimeMessage, RuntimeSettings};
use crate::errors::TabError;

/// A browser tab that runtime messages can be sent to.
#[async_trait]
pub trait TabPort: Send + Sync {
    fn id(&self) -> &TabId;

    /// Deliver `message` to the content script listening in the tab.
    async fn send_message(&self, message: &RuntimeMessage) -> Result<Value, TabError>;

    /// Load the content script into the tab.
    async fn inject_content_script(&self) -> Result<(), TabError>;
}

/// Send `message`; when nothing is listening yet, inject the content script
/// and retry exactly once.
#[instrument(skip_all, fields(tab = %tab.id(), action = message.action()))]
pub async fn send_with_reinject(
    tab: &dyn TabPort,
    message: &RuntimeMessage,
) -> Result<Value, TabError> {
    match tab.send_message(message).await {
        Err(err) if err.is_receiving_end_missing() => {
            warn!(error = %err, "Content script 없음, 주입 후 재시도");
            tab.inject_content_script().await?;
            tab.send_message(message).await
        }
        other => other,
    }
}

/// Tab whose content runtime lives in this process.
///
/// Nothing listens until [`inject_content_script`](TabPort::inject_content_script)
/// or [`attach`](Self::attach) runs, like a tab opened before the extension
/// was installed.
pub struct LocalTab {
    id: TabId,
    page: PageHandles,
    settings: RuntimeSettings,
    env: RuntimeEnv,
    runtime: RwLock<Option<Arc<ContentRuntime>>>,
}

impl LocalTab {
    pub fn new(page: PageHandles, settings: RuntimeSettings, env: RuntimeEnv) -> Self {
        Self {
            id: TabId::new(),
            page,
            settings,
            env,
            runtime: RwLock::new(None),
        }
    }

    /// The attached runtime, injecting it first if needed.
    pub fn attach(&self) -> Result<Arc<ContentRuntime>, TabError> {
        let mut slot = self.runtime.write();
        if let Some(runtime) = slot.as_ref() {
            return Ok(runtime.clone());
        }
        let runtime = Arc::new(ContentRuntime::inject(
            self.page.clone(),
            self.settings.clone(),
            self.env.clone(),
        )?);
        *slot = Some(runtime.clone());
        info!(tab = %self.id, "content script attached");
        Ok(runtime)
    }

    pub fn runtime(&self) -> Option<Arc<ContentRuntime>> {
        self.runtime.read().clone()
    }

    /// Drop the runtime, as a navigation would.
    pub fn detach(&self) {
        if self.runtime.write().take().is_some() {
            info!(tab = %self.id, "content script detached");
        }
    }
}

#[async_trait]
impl TabPort for LocalTab {
    fn id(&self) -> &TabId {
        &self.id
    }

    async fn send_message(&self, message: &RuntimeMessage) -> Result<Value, TabError> {
        let runtime = self.runtime().ok_or(TabError::ReceivingEndMissing)?;
        Ok(runtime.handle(message.clone()).await)
    }

    async fn inject_content_script(&self) -> Result<(), TabError> {
        self.attach().map(|_| ())
    }
}
