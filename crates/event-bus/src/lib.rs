//! Status bus carrying progress and notify events from the content side to the
//! background relay and the control surface.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::trace;

use nice_core_types::PageType;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("no subscribers for event")]
    NoSubscribers,
}

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), BusError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// Simple in-memory bus backed by a tokio broadcast channel.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), BusError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|_| BusError::NoSubscribers)
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Messages sent outward from the content runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum StatusEvent {
    /// `current` records of `total` have been started.
    Progress { current: usize, total: usize },
    Notify {
        title: String,
        message: String,
        level: NotifyLevel,
    },
    /// The content runtime finished attaching to a page.
    Ready { page_type: Option<PageType> },
}

impl StatusEvent {
    pub fn progress(current: usize, total: usize) -> Self {
        StatusEvent::Progress { current, total }
    }

    pub fn notify(title: impl Into<String>, message: impl Into<String>, level: NotifyLevel) -> Self {
        StatusEvent::Notify {
            title: title.into(),
            message: message.into(),
            level,
        }
    }
}

pub type StatusBus = InMemoryBus<StatusEvent>;

/// Publish a status event, treating a bus with nobody listening as fine.
pub async fn emit<B>(bus: &B, event: StatusEvent)
where
    B: EventBus<StatusEvent> + ?Sized,
{
    if let Err(err) = bus.publish(event).await {
        trace!(error = %err, "status event dropped");
    }
}
