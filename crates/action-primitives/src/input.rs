//! Synthetic input: value assignment with the event sequence a person's
//! typing produces.

use std::sync::Arc;

use dom_adapter::{DomEvent, DomPort, KeyInput, NodeId};
use nice_core_types::InputConfig;
use tracing::{debug, instrument};

use crate::clock::Clock;
use crate::errors::ActionError;
use crate::pacing::Pacer;

pub struct InputSimulator {
    dom: Arc<dyn DomPort>,
    clock: Arc<dyn Clock>,
    pacer: Arc<Pacer>,
}

impl InputSimulator {
    pub fn new(dom: Arc<dyn DomPort>, clock: Arc<dyn Clock>, pacer: Arc<Pacer>) -> Self {
        Self { dom, clock, pacer }
    }

    async fn pause(&self, min_ms: u64, max_ms: u64) {
        self.clock.sleep(self.pacer.pause(min_ms, max_ms)).await;
    }

    /// keydown followed by keyup.
    pub async fn press(&self, node: NodeId, key: KeyInput) -> Result<(), ActionError> {
        self.dom.dispatch(node, DomEvent::KeyDown(key.clone())).await?;
        self.dom.dispatch(node, DomEvent::KeyUp(key)).await?;
        Ok(())
    }

    /// Click, focus, clear, type and finalize `value` into `node`.
    ///
    /// Blur is left to the caller so several fields can be filled before
    /// focus leaves the form.
    #[instrument(skip_all, fields(node = %node, len = value.chars().count(), human = config.human_mode))]
    pub async fn set_value(
        &self,
        node: NodeId,
        value: &str,
        config: &InputConfig,
    ) -> Result<(), ActionError> {
        self.dom.click(node).await?;
        self.pause(30, 80).await;
        self.dom.focus(node).await?;

        self.dom.set_value(node, "").await?;
        self.dom.dispatch(node, DomEvent::Input).await?;
        self.pause(20, 50).await;

        if config.human_mode {
            let plan = self.pacer.typing_plan(value, &config.profile());
            for step in &plan.steps {
                self.dom.set_value(node, &step.typed).await?;
                self.dom.dispatch(node, DomEvent::Input).await?;
                for ch in step.chunk.chars() {
                    self.press(node, KeyInput::char(ch)).await?;
                }
                self.clock
                    .sleep(std::time::Duration::from_millis(step.delay_ms))
                    .await;
                if let Some(extra) = step.word_pause_ms {
                    self.clock
                        .sleep(std::time::Duration::from_millis(extra))
                        .await;
                }
            }
        } else {
            self.dom.set_value(node, value).await?;
            self.dom.dispatch(node, DomEvent::Input).await?;
        }

        self.press(node, KeyInput::named("End")).await?;
        self.dom.dispatch(node, DomEvent::Change).await?;

        let preview: String = value.chars().take(30).collect();
        debug!(preview = %preview, "값 설정 완료");
        Ok(())
    }
}
