//! Polling element lookup.

use std::sync::Arc;
use std::time::Duration;

use dom_adapter::{DomPort, NodeId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::clock::Clock;
use crate::errors::ActionError;

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct Locator {
    dom: Arc<dyn DomPort>,
    clock: Arc<dyn Clock>,
}

impl Locator {
    pub fn new(dom: Arc<dyn DomPort>, clock: Arc<dyn Clock>) -> Self {
        Self { dom, clock }
    }

    /// Query `selector` every [`POLL_INTERVAL`] until it matches or `timeout`
    /// elapses. Timeout and cancellation yield `Ok(None)`.
    #[instrument(skip_all, fields(selector = %selector, timeout_ms = timeout.as_millis() as u64))]
    pub async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<NodeId>, ActionError> {
        let started = self.clock.elapsed();
        loop {
            if cancel.is_cancelled() {
                debug!("lookup cancelled");
                return Ok(None);
            }
            if let Some(node) = self.dom.query(None, selector).await? {
                return Ok(Some(node));
            }
            if self.clock.elapsed().saturating_sub(started) >= timeout {
                debug!("element not found before deadline");
                return Ok(None);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = self.clock.sleep(POLL_INTERVAL) => {}
            }
        }
    }
}
