use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use action_primitives::{Clock, TokioClock};
use chrono::Utc;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::command::BridgeCommand;
use crate::errors::BridgeError;
use crate::protocol::{BridgeRequest, BridgeResponse, BridgeVariant};
use crate::window::{Window, WindowMessage};

type Reply = Result<Value, BridgeError>;
type PendingMap = DashMap<String, oneshot::Sender<Reply>>;

/// Content-side request helper correlating responses by `requestId`.
///
/// Without a timeout a request the page never answers stays pending until
/// the client is dropped. The timeout runs on the client's [`Clock`].
pub struct BridgeClient {
    window: Window,
    variant: BridgeVariant,
    counter: AtomicU64,
    pending: Arc<PendingMap>,
    timeout: Option<Duration>,
    clock: Arc<dyn Clock>,
    listener: JoinHandle<()>,
}

impl BridgeClient {
    /// Start listening for responses on `window`. Must run inside a tokio runtime.
    pub fn new(window: Window, variant: BridgeVariant) -> Self {
        let pending: Arc<PendingMap> = Arc::new(DashMap::new());
        let receiver = window.subscribe();
        let listener = tokio::spawn(listen(
            window.clone(),
            variant,
            receiver,
            pending.clone(),
        ));
        Self {
            window,
            variant,
            counter: AtomicU64::new(0),
            pending,
            timeout: None,
            clock: Arc::new(TokioClock::new()),
            listener,
        }
    }

    /// Reject and evict requests unanswered after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn variant(&self) -> BridgeVariant {
        self.variant
    }

    /// Requests sent but not answered yet.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn next_request_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("req_{}_{}", Utc::now().timestamp_millis(), n)
    }

    /// Post `command` and wait for its response data.
    #[instrument(skip_all, fields(action = command.action()))]
    pub async fn send(&self, command: &BridgeCommand) -> Result<Value, BridgeError> {
        let request_id = self.next_request_id();
        let request = BridgeRequest {
            kind: self.variant.request_type().to_string(),
            request_id: request_id.clone(),
            action: command.action().to_string(),
            payload: command.payload()?,
        };

        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id.clone(), tx);
        self.window.post_message(serde_json::to_value(&request)?);
        debug!(request_id = %request_id, "bridge request posted");

        let reply = match self.timeout {
            Some(timeout) => tokio::select! {
                biased;
                reply = rx => reply,
                _ = self.clock.sleep(timeout) => {
                    self.pending.remove(&request_id);
                    warn!(request_id = %request_id, "bridge request timed out");
                    return Err(BridgeError::Timeout {
                        action: command.action().to_string(),
                        request_id,
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            },
            None => rx.await,
        };
        reply.map_err(|_| BridgeError::ChannelClosed)?
    }

    /// [`send`](Self::send) and decode the response data.
    pub async fn request<T: DeserializeOwned>(&self, command: &BridgeCommand) -> Result<T, BridgeError> {
        let data = self.send(command).await?;
        Ok(serde_json::from_value(data)?)
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(
    window: Window,
    variant: BridgeVariant,
    mut receiver: broadcast::Receiver<WindowMessage>,
    pending: Arc<PendingMap>,
) {
    loop {
        let message = match receiver.recv().await {
            Ok(message) => message,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "bridge client lagged behind window messages");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if !window.accepts(&message, variant.response_type()) {
            continue;
        }
        let response: BridgeResponse = match serde_json::from_value(message.data) {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "ignoring malformed bridge response");
                continue;
            }
        };
        let Some((_, resolver)) = pending.remove(&response.request_id) else {
            continue;
        };
        let reply = if response.success {
            Ok(response.data.unwrap_or(Value::Null))
        } else {
            Err(BridgeError::Remote(
                response
                    .error
                    .unwrap_or_else(|| "Bridge request failed".to_string()),
            ))
        };
        let _ = resolver.send(reply);
    }
}
