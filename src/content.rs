//! Content-side runtime attached to one NEIS tab.
//!
//! Injecting the runtime starts the page-side responder on a fresh window
//! channel and builds the orchestrator on the content side. Runtime messages
//! from the control surface are answered in the same shapes the browser
//! extension used.

use std::sync::Arc;
use std::time::Duration;

use action_flow::{BatchExecutor, BatchPayload, BatchResult, FlowError, RetryPolicy};
use action_primitives::{ActionPrimitives, Clock, Pacer, TokioClock};
use dom_adapter::{DomPort, FrameworkPort};
use dom_snapshot::SnapshotOptions;
use nice_core_types::{EvalRecord, PageType, PlanRecord};
use nice_event_bus::{emit, StatusBus, StatusEvent};
use page_bridge::{
    AppHandlers, BridgeClient, BridgeCommand, BridgeResponder, BridgeVariant, DomHandlers,
    PageTypeResult, Window,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::errors::TabError;

/// Messages the control surface sends to the content runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    GetPageType,
    FillMonthlyPlans {
        data: BatchPayload<PlanRecord>,
    },
    FillMonthlyEvaluations {
        data: BatchPayload<EvalRecord>,
    },
    GetCurrentStudent,
    GetCurrentPlans,
    CaptureDomStructure {
        #[serde(default)]
        options: SnapshotOptions,
    },
}

impl RuntimeMessage {
    pub fn action(&self) -> &'static str {
        match self {
            RuntimeMessage::GetPageType => "getPageType",
            RuntimeMessage::FillMonthlyPlans { .. } => "fillMonthlyPlans",
            RuntimeMessage::FillMonthlyEvaluations { .. } => "fillMonthlyEvaluations",
            RuntimeMessage::GetCurrentStudent => "getCurrentStudent",
            RuntimeMessage::GetCurrentPlans => "getCurrentPlans",
            RuntimeMessage::CaptureDomStructure { .. } => "captureDomStructure",
        }
    }
}

/// Ports into the tab's document.
#[derive(Clone)]
pub struct PageHandles {
    pub dom: Arc<dyn DomPort>,
    /// Needed by the component-API bridge only.
    pub framework: Option<Arc<dyn FrameworkPort>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub variant: BridgeVariant,
    pub request_timeout: Option<Duration>,
    pub host_filter: String,
}

impl RuntimeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            variant: config.bridge.variant,
            request_timeout: config.bridge.request_timeout(),
            host_filter: config.browser.host_filter.clone(),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Shared services a runtime is built with.
#[derive(Clone)]
pub struct RuntimeEnv {
    pub clock: Arc<dyn Clock>,
    pub pacer: Arc<Pacer>,
    pub bus: Arc<StatusBus>,
    /// Cancels the running batch and any element polling.
    pub cancel: CancellationToken,
}

impl RuntimeEnv {
    /// Wall clock and entropy seeded pacing.
    pub fn live(bus: Arc<StatusBus>, cancel: CancellationToken) -> Self {
        Self {
            clock: Arc::new(TokioClock::new()),
            pacer: Arc::new(Pacer::from_entropy()),
            bus,
            cancel,
        }
    }
}

pub struct ContentRuntime {
    dom: Arc<dyn DomPort>,
    executor: BatchExecutor,
    bus: Arc<StatusBus>,
    settings: RuntimeSettings,
    stop: CancellationToken,
}

impl ContentRuntime {
    /// Start the page-side responder and the content-side orchestrator.
    /// Must run inside a tokio runtime.
    #[instrument(skip_all, fields(variant = ?settings.variant))]
    pub fn inject(
        page: PageHandles,
        settings: RuntimeSettings,
        env: RuntimeEnv,
    ) -> Result<Self, TabError> {
        let window = Window::new();
        let stop = CancellationToken::new();

        match settings.variant {
            BridgeVariant::Dom => {
                let actions = ActionPrimitives::new(page.dom.clone(), env.clock.clone(), env.pacer)
                    .with_cancel(env.cancel.clone());
                let handlers = Arc::new(DomHandlers::new(actions));
                BridgeResponder::new(window.clone(), BridgeVariant::Dom, handlers)
                    .spawn(stop.clone());
            }
            BridgeVariant::App => {
                let framework = page.framework.clone().ok_or_else(|| {
                    TabError::Injection("component framework port unavailable".to_string())
                })?;
                let handlers = Arc::new(AppHandlers::new(framework, env.clock.clone()));
                BridgeResponder::new(window.clone(), BridgeVariant::App, handlers)
                    .spawn(stop.clone());
            }
        }
        info!("bridge injected");

        let client = BridgeClient::new(window, settings.variant)
            .with_timeout(settings.request_timeout)
            .with_clock(env.clock.clone());
        let executor = BatchExecutor::new(client, page.dom.clone(), env.clock, env.bus.clone())
            .with_cancel(env.cancel);

        Ok(Self {
            dom: page.dom,
            executor,
            bus: env.bus,
            settings,
            stop,
        })
    }

    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Whether the tab shows the configured host.
    pub async fn is_target_page(&self) -> bool {
        match self.dom.location().await {
            Ok(url) => url.contains(&self.settings.host_filter),
            Err(err) => {
                error!(error = %err, "페이지 주소를 읽을 수 없습니다");
                false
            }
        }
    }

    /// Initialization run once the page has loaded: bring the bridge up with
    /// the page-load budget and announce the page type.
    #[instrument(skip_all)]
    pub async fn on_page_load(&self) -> bool {
        if !self.is_target_page().await {
            info!(host = %self.settings.host_filter, "나이스 페이지가 아닙니다");
            return false;
        }
        info!("페이지 로드 완료, 초기화 시작");
        let ready = self.executor.initialize(&RetryPolicy::PAGE_LOAD).await;
        if ready {
            let page_type = self.detect_page_type().await.ok().flatten();
            emit(self.bus.as_ref(), StatusEvent::Ready { page_type }).await;
        }
        ready
    }

    async fn detect_page_type(&self) -> Result<Option<PageType>, page_bridge::BridgeError> {
        let result: PageTypeResult = self
            .executor
            .client()
            .request(&BridgeCommand::DetectPageType)
            .await?;
        Ok(result.page_type)
    }

    /// Answer one runtime message.
    #[instrument(skip_all, fields(action = message.action()))]
    pub async fn handle(&self, message: RuntimeMessage) -> Value {
        info!("{} 메시지 받음", message.action());
        match message {
            RuntimeMessage::GetPageType => match self.detect_page_type().await {
                Ok(Some(page_type)) => {
                    info!(page_type = %page_type, "페이지 유형");
                    json!({"success": true, "pageType": page_type})
                }
                Ok(None) => json!({"success": false, "pageType": null}),
                Err(err) => {
                    error!(error = %err, "페이지 유형 감지 오류");
                    json!({"success": false, "pageType": null, "error": err.to_string()})
                }
            },
            RuntimeMessage::FillMonthlyPlans { data } => {
                batch_response(self.executor.fill_plans(data).await)
            }
            RuntimeMessage::FillMonthlyEvaluations { data } => {
                batch_response(self.executor.fill_evaluations(data).await)
            }
            RuntimeMessage::GetCurrentStudent => {
                json!({"success": true, "data": self.executor.current_student()})
            }
            RuntimeMessage::GetCurrentPlans => {
                json!({"success": true, "data": self.executor.current_plans()})
            }
            RuntimeMessage::CaptureDomStructure { options } => {
                match dom_snapshot::capture(self.dom.as_ref(), options).await {
                    Ok(snapshot) => json!({"success": true, "data": snapshot}),
                    Err(err) => {
                        error!(error = %err, "DOM 캡처 실패");
                        json!({"success": false, "error": err.to_string()})
                    }
                }
            }
        }
    }
}

impl Drop for ContentRuntime {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

fn batch_response(result: Result<BatchResult, FlowError>) -> Value {
    match result {
        Ok(batch) => serde_json::to_value(&batch)
            .unwrap_or_else(|err| json!({"success": false, "error": err.to_string()})),
        Err(err) => {
            error!(error = %err, "오류");
            json!({"success": false, "error": err.to_string()})
        }
    }
}
