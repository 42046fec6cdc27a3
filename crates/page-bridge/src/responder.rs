use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command::BridgeCommand;
use crate::errors::BridgeError;
use crate::protocol::{BridgeRequest, BridgeResponse, BridgeVariant};
use crate::window::Window;

/// Page-side executor of bridge commands.
#[async_trait]
pub trait BridgeHandler: Send + Sync + 'static {
    async fn handle(&self, command: BridgeCommand) -> Result<Value, BridgeError>;
}

/// Page-side listener answering every request posted on its window.
pub struct BridgeResponder<H> {
    window: Window,
    variant: BridgeVariant,
    handler: Arc<H>,
}

impl<H> Clone for BridgeResponder<H> {
    fn clone(&self) -> Self {
        Self {
            window: self.window.clone(),
            variant: self.variant,
            handler: self.handler.clone(),
        }
    }
}

impl<H: BridgeHandler> BridgeResponder<H> {
    pub fn new(window: Window, variant: BridgeVariant, handler: Arc<H>) -> Self {
        Self {
            window,
            variant,
            handler,
        }
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Build the response for one raw request.
    pub async fn respond_to(&self, request: BridgeRequest) -> BridgeResponse {
        let request_id = request.request_id.clone();
        let command = match BridgeCommand::parse(&request.action, request.payload) {
            Ok(command) => command,
            Err(err) => {
                warn!(action = %request.action, error = %err, "rejecting bridge request");
                return BridgeResponse::failed(self.variant, &request_id, err.to_string());
            }
        };

        debug!(action = command.action(), request_id = %request_id, "handling bridge request");
        match self.handler.handle(command).await {
            Ok(data) => BridgeResponse::ok(self.variant, &request_id, data),
            Err(err) => {
                error!(request_id = %request_id, error = %err, "[Bridge] 오류");
                BridgeResponse::failed(self.variant, &request_id, err.to_string())
            }
        }
    }

    /// Listen until `cancel` fires. Requests are handled concurrently.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        let mut receiver = self.window.subscribe();
        info!(variant = ?self.variant, "bridge responder initialized");
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(message) => message,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "bridge responder lagged behind window messages");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };
                if !self.window.accepts(&message, self.variant.request_type()) {
                    continue;
                }
                let request: BridgeRequest = match serde_json::from_value(message.data) {
                    Ok(request) => request,
                    Err(err) => {
                        debug!(error = %err, "ignoring malformed bridge request");
                        continue;
                    }
                };
                let responder = self.clone();
                tokio::spawn(async move {
                    let response = responder.respond_to(request).await;
                    match serde_json::to_value(&response) {
                        Ok(data) => responder.window.post_message(data),
                        Err(err) => error!(error = %err, "failed to encode bridge response"),
                    }
                });
            }
        })
    }
}
