//! Element location, synthetic input and human-like pacing.
//!
//! - [`Locator`] polls for a selector until it matches or a deadline passes
//! - [`InputSimulator`] types values the way a person would, chunk by chunk
//! - [`Pacer`] produces the randomised pauses both of them rely on
//! - [`Clock`] is the seam every timed wait goes through

pub mod clock;
pub mod errors;
mod input;
mod locator;
pub mod pacing;

pub use clock::{Clock, ManualClock, TokioClock};
pub use errors::ActionError;
pub use input::InputSimulator;
pub use locator::{Locator, DEFAULT_TIMEOUT, POLL_INTERVAL};
pub use pacing::{Pacer, TypingPlan, TypingStep};

use std::sync::Arc;
use std::time::Duration;

use dom_adapter::{DomPort, NodeId};
use nice_core_types::InputConfig;
use tokio_util::sync::CancellationToken;

/// Everything a page-side handler needs to act on the document.
#[derive(Clone)]
pub struct ActionPrimitives {
    dom: Arc<dyn DomPort>,
    clock: Arc<dyn Clock>,
    pacer: Arc<Pacer>,
    cancel: CancellationToken,
}

impl ActionPrimitives {
    pub fn new(dom: Arc<dyn DomPort>, clock: Arc<dyn Clock>, pacer: Arc<Pacer>) -> Self {
        Self {
            dom,
            clock,
            pacer,
            cancel: CancellationToken::new(),
        }
    }

    /// Real time, entropy seeded pacing.
    pub fn with_tokio(dom: Arc<dyn DomPort>) -> Self {
        Self::new(dom, Arc::new(TokioClock::new()), Arc::new(Pacer::from_entropy()))
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn dom(&self) -> &Arc<dyn DomPort> {
        &self.dom
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn pacer(&self) -> &Arc<Pacer> {
        &self.pacer
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn locator(&self) -> Locator {
        Locator::new(self.dom.clone(), self.clock.clone())
    }

    pub fn input(&self) -> InputSimulator {
        InputSimulator::new(self.dom.clone(), self.clock.clone(), self.pacer.clone())
    }

    /// Poll for `selector` for up to `timeout`.
    pub async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<NodeId>, ActionError> {
        self.locator()
            .wait_for_element(selector, timeout, &self.cancel)
            .await
    }

    pub async fn set_value(
        &self,
        node: NodeId,
        value: &str,
        config: &InputConfig,
    ) -> Result<(), ActionError> {
        self.input().set_value(node, value, config).await
    }

    pub async fn sleep_ms(&self, ms: u64) {
        self.clock.sleep(Duration::from_millis(ms)).await;
    }

    /// Random pause in `[min_ms, max_ms]`, sometimes with extra hesitation.
    pub async fn pause(&self, min_ms: u64, max_ms: u64) {
        let delay = self.pacer.pause(min_ms, max_ms);
        self.clock.sleep(delay).await;
    }

    /// Pause drawn from the speed profile's field delay range.
    pub async fn field_pause(&self, config: &InputConfig) {
        let (min, max) = config.profile().field_delay_ms;
        self.pause(min, max).await;
    }
}
