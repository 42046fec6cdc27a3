//! Background relay.
//!
//! Sits between the content runtime and whoever is watching: remembers the
//! latest progress, rebroadcasts it as `progress_update`, turns notify events
//! into notifications and forwards control messages to the active tab.

use std::sync::Arc;

use nice_event_bus::{EventBus, NotifyLevel, StatusBus, StatusEvent};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RelaySection;
use crate::content::RuntimeMessage;
use crate::errors::TabError;
use crate::tab::TabPort;

pub const DEFAULT_NOTIFY_TITLE: &str = "나이스 자동입력";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// What the relay sends on to its listeners.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RelayUpdate {
    ProgressUpdate {
        data: Progress,
    },
    Notification {
        title: String,
        message: String,
        level: NotifyLevel,
    },
}

pub struct BackgroundRelay {
    settings: RelaySection,
    last_progress: Mutex<Option<Progress>>,
    updates: broadcast::Sender<RelayUpdate>,
    active_tab: RwLock<Option<Arc<dyn TabPort>>>,
}

impl BackgroundRelay {
    pub fn new(settings: RelaySection) -> Arc<Self> {
        let (updates, _) = broadcast::channel(64);
        Arc::new(Self {
            settings,
            last_progress: Mutex::new(None),
            updates,
            active_tab: RwLock::new(None),
        })
    }

    pub fn set_active_tab(&self, tab: Arc<dyn TabPort>) {
        *self.active_tab.write() = Some(tab);
    }

    pub fn last_progress(&self) -> Option<Progress> {
        *self.last_progress.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayUpdate> {
        self.updates.subscribe()
    }

    /// Forward `message` to the active tab.
    pub async fn relay_to_content(&self, message: &RuntimeMessage) -> Result<Value, TabError> {
        let tab = self.active_tab.read().clone().ok_or(TabError::NoActiveTab)?;
        debug!(tab = %tab.id(), action = message.action(), "relaying to content");
        tab.send_message(message).await
    }

    pub fn handle_event(&self, event: StatusEvent) {
        match event {
            StatusEvent::Progress { current, total } => {
                let progress = Progress { current, total };
                *self.last_progress.lock() = Some(progress);
                self.publish(RelayUpdate::ProgressUpdate { data: progress });
            }
            StatusEvent::Notify {
                title,
                message,
                level,
            } => {
                if !self.settings.notifications {
                    debug!(%message, "notifications disabled");
                    return;
                }
                let title = if title.trim().is_empty() {
                    DEFAULT_NOTIFY_TITLE.to_string()
                } else {
                    title
                };
                info!(title = %title, level = ?level, "{}", message);
                self.publish(RelayUpdate::Notification {
                    title,
                    message,
                    level,
                });
            }
            StatusEvent::Ready { page_type } => {
                info!(page_type = ?page_type, "페이지 준비 완료");
            }
        }
    }

    fn publish(&self, update: RelayUpdate) {
        // nobody watching is fine
        let _ = self.updates.send(update);
    }

    /// Consume `bus` until `cancel` fires or the bus closes.
    pub fn spawn(self: &Arc<Self>, bus: &StatusBus, cancel: CancellationToken) -> JoinHandle<()> {
        let mut events = bus.subscribe();
        let relay = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(event) => relay.handle_event(event),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "relay fell behind the status bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("background relay stopped");
        })
    }
}
