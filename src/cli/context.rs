use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use dom_adapter::cdp::{CdpDom, CdpSession};
use dom_adapter::{DomPort, FrameworkPort};
use nice_autofill_cli::background::BackgroundRelay;
use nice_autofill_cli::config::AppConfig;
use nice_autofill_cli::content::{PageHandles, RuntimeEnv, RuntimeSettings};
use nice_autofill_cli::tab::LocalTab;
use nice_event_bus::{InMemoryBus, StatusBus};
use page_bridge::BridgeVariant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::output::OutputFormat;

const STATUS_BUS_CAPACITY: usize = 256;

pub struct CliContext {
    config: Arc<AppConfig>,
    config_path: PathBuf,
    output: OutputFormat,
    cancel: CancellationToken,
}

/// A connected NEIS tab with its relay running.
pub struct TabSession {
    pub tab: Arc<LocalTab>,
    pub relay: Arc<BackgroundRelay>,
    pub bus: Arc<StatusBus>,
    _browser: CdpSession,
}

impl CliContext {
    pub fn new(
        config: AppConfig,
        config_path: PathBuf,
        output: OutputFormat,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
            cancel,
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Fires on Ctrl-C.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Attach to the browser and pick the first tab on the NEIS host.
    ///
    /// Nothing is injected yet; the first message does that.
    pub async fn connect_tab(&self) -> Result<TabSession> {
        let browser_config = &self.config.browser;
        let mut browser = CdpSession::connect(&browser_config.debugger_url)
            .await
            .with_context(|| format!("connecting to {}", browser_config.debugger_url))?;
        let page = browser
            .find_page(&browser_config.host_filter)
            .await
            .context("나이스 페이지에서 실행해주세요")?;

        let dom = CdpDom::new(page);
        let framework: Option<Arc<dyn FrameworkPort>> = match self.config.bridge.variant {
            BridgeVariant::App => Some(Arc::new(dom.framework())),
            BridgeVariant::Dom => None,
        };
        let dom: Arc<dyn DomPort> = Arc::new(dom);
        info!(url = %dom.location().await.unwrap_or_default(), "attached to tab");

        let bus: Arc<StatusBus> = InMemoryBus::new(STATUS_BUS_CAPACITY);
        let relay = BackgroundRelay::new(self.config.relay.clone());
        relay.spawn(&bus, self.cancel.child_token());

        let tab = Arc::new(LocalTab::new(
            PageHandles { dom, framework },
            RuntimeSettings::from_config(&self.config),
            RuntimeEnv::live(bus.clone(), self.cancel.clone()),
        ));
        relay.set_active_tab(tab.clone());

        Ok(TabSession {
            tab,
            relay,
            bus,
            _browser: browser,
        })
    }
}
