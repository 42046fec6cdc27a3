//! Handlers working on the document through [`DomPort`](dom_adapter::DomPort).

use std::time::Duration;

use action_grid::GridNavigator;
use action_primitives::{ActionPrimitives, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use dom_adapter::{DomEvent, KeyInput, NodeId};
use nice_core_types::{
    academic_value, InputConfig, InputConfigPatch, MonthKeyed, PageType,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::command::{
    BridgeCommand, PageTypeResult, SelectMonthPayload, SelectRowByIndexPayload,
    SelectRowByMonthPayload, SetEvalTextPayload, SetFieldsPayload, StudentSelection,
};
use crate::errors::BridgeError;
use crate::responder::BridgeHandler;

/// Host page selectors for the plan and evaluation screens.
pub mod selectors {
    pub const ADD_ROW_BUTTON: &str = r#"[title="행추가"]"#;
    pub const SAVE_BUTTON: &str = r#"[title="저장"]"#;
    pub const MONTH_COMBOBOX: &str = r#"[role="combobox"][title="월"]"#;
    pub const MONTH_LISTBOX: &str = r#".cl-combobox-list[role="listbox"]"#;
    pub const GOAL_TEXTAREA: &str = r#"[title="교육목표"] textarea"#;
    pub const CONTENT_TEXTAREA: &str = r#"[title="교육내용"] textarea"#;
    pub const METHOD_TEXTAREA: &str = r#"[title="교육방법"] textarea"#;
    pub const EVALUATION_TEXTAREA: &str = r#"[title="평가계획"] textarea"#;
}

const PAGE_PROBE_TIMEOUT: Duration = Duration::from_millis(2000);
const COMBOBOX_TIMEOUT: Duration = Duration::from_millis(3000);
const LISTBOX_CLOSE_WAIT_MS: u64 = 500;
/// List position right after `Home`: March.
const FIRST_LIST_POSITION: i64 = 3;

/// DOM-only handler set: buttons, combobox keyboard navigation, text areas
/// and the grid navigator.
pub struct DomHandlers {
    actions: ActionPrimitives,
    navigator: GridNavigator,
    config: Mutex<InputConfig>,
}

impl DomHandlers {
    pub fn new(actions: ActionPrimitives) -> Self {
        Self {
            navigator: GridNavigator::new(actions.clone()),
            actions,
            config: Mutex::new(InputConfig::default()),
        }
    }

    pub fn navigator(&self) -> &GridNavigator {
        &self.navigator
    }

    /// Input settings as last merged from a payload.
    pub fn config(&self) -> InputConfig {
        *self.config.lock()
    }

    fn merge_config(&self, patch: Option<&InputConfigPatch>) -> InputConfig {
        let mut config = self.config.lock();
        if let Some(patch) = patch {
            config.merge(patch);
            debug!(speed = %config.speed, human_mode = config.human_mode, "입력 설정");
        }
        *config
    }

    async fn press(&self, node: NodeId, key: &str) -> Result<(), BridgeError> {
        self.actions
            .dom()
            .dispatch(node, DomEvent::KeyDown(KeyInput::named(key)))
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn ensure_app(&self) -> Result<Value, BridgeError> {
        if self
            .actions
            .wait_for(selectors::ADD_ROW_BUTTON, PAGE_PROBE_TIMEOUT)
            .await?
            .is_some()
        {
            info!("월별계획 페이지 확인됨");
            return Ok(json!({
                "ready": true,
                "pageType": PageType::Plan,
                "message": "월별계획 페이지 준비 완료",
            }));
        }
        if self
            .actions
            .wait_for(selectors::SAVE_BUTTON, PAGE_PROBE_TIMEOUT)
            .await?
            .is_some()
        {
            info!("월별평가 페이지 확인됨");
            return Ok(json!({
                "ready": true,
                "pageType": PageType::Evaluation,
                "message": "월별평가 페이지 준비 완료",
            }));
        }
        Err(BridgeError::handler("월별계획/평가 페이지를 찾을 수 없습니다"))
    }

    /// Immediate check, no waiting.
    pub async fn detect_page_type(&self) -> Result<PageTypeResult, BridgeError> {
        let dom = self.actions.dom();
        let page_type = if dom.query(None, selectors::ADD_ROW_BUTTON).await?.is_some() {
            Some(PageType::Plan)
        } else if dom.query(None, selectors::SAVE_BUTTON).await?.is_some() {
            Some(PageType::Evaluation)
        } else {
            None
        };
        match page_type {
            Some(page_type) => info!(page_type = %page_type, "페이지 유형 감지됨"),
            None => info!("페이지 유형을 감지할 수 없음"),
        }
        Ok(PageTypeResult { page_type })
    }

    pub async fn add_row(&self) -> Result<bool, BridgeError> {
        let button = self
            .actions
            .wait_for(selectors::ADD_ROW_BUTTON, DEFAULT_TIMEOUT)
            .await?
            .ok_or_else(|| BridgeError::handler("행추가 버튼을 찾을 수 없습니다"))?;
        self.actions.dom().click(button).await?;
        info!("행추가 버튼 클릭 완료");
        self.actions.sleep_ms(400).await;
        Ok(true)
    }

    /// Pick months in the month combobox with keyboard navigation.
    #[instrument(skip_all)]
    pub async fn select_month(&self, payload: &SelectMonthPayload) -> Result<bool, BridgeError> {
        let mut months: Vec<u32> = payload
            .month_list()
            .iter()
            .map(|m| m.digits())
            .filter(|d| !d.is_empty())
            .filter_map(|d| d.parse().ok())
            .collect();
        if months.is_empty() {
            return Ok(false);
        }
        months.sort_by_key(|m| academic_value(*m));

        let dom = self.actions.dom().clone();
        let Some(combobox) = self
            .actions
            .wait_for(selectors::MONTH_COMBOBOX, COMBOBOX_TIMEOUT)
            .await?
        else {
            warn!("월 combobox를 찾을 수 없습니다");
            return Ok(false);
        };

        if dom.query(None, selectors::MONTH_LISTBOX).await?.is_none() {
            dom.focus(combobox).await?;
            self.actions.sleep_ms(100).await;
            dom.click(combobox).await?;
            self.actions.sleep_ms(300).await;
            if self
                .actions
                .wait_for(selectors::MONTH_LISTBOX, COMBOBOX_TIMEOUT)
                .await?
                .is_none()
            {
                warn!("드롭다운 listbox를 찾을 수 없습니다");
                return Ok(false);
            }
        } else {
            dom.focus(combobox).await?;
            self.actions.sleep_ms(100).await;
        }

        self.press(combobox, "Home").await?;
        self.actions.sleep_ms(150).await;

        let mut position = FIRST_LIST_POSITION;
        for month in &months {
            let target = academic_value(*month) as i64;
            let steps = target - position;
            let key = if steps > 0 { "ArrowDown" } else { "ArrowUp" };
            for _ in 0..steps.abs() {
                self.press(combobox, key).await?;
                self.actions.sleep_ms(50).await;
            }
            position = target;
            self.actions.sleep_ms(100).await;
            self.press(combobox, "Enter").await?;
            self.actions.sleep_ms(150).await;
        }

        self.press(combobox, "Escape").await?;
        self.actions.sleep_ms(200).await;

        let mut waited = 0;
        while waited < LISTBOX_CLOSE_WAIT_MS {
            if dom.query(None, selectors::MONTH_LISTBOX).await?.is_none() {
                break;
            }
            self.actions.sleep_ms(50).await;
            waited += 50;
        }
        self.actions.sleep_ms(150).await;
        debug!(?months, "월 선택 완료");
        Ok(true)
    }

    /// Type the plan text fields; a missing field is only a warning.
    #[instrument(skip_all)]
    pub async fn set_fields(&self, payload: &SetFieldsPayload) -> Result<bool, BridgeError> {
        let config = self.merge_config(payload.config.as_ref());
        let (min_field, max_field) = config.profile().field_delay_ms;

        let fields = [
            (selectors::GOAL_TEXTAREA, payload.goal.as_str(), "교육목표"),
            (selectors::CONTENT_TEXTAREA, payload.content.as_str(), "교육내용"),
            (selectors::METHOD_TEXTAREA, payload.method.as_str(), "교육방법"),
            (selectors::EVALUATION_TEXTAREA, payload.evaluation.as_str(), "평가계획"),
        ];
        let last = fields.len() - 1;

        for (i, (selector, value, label)) in fields.into_iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let Some(area) = self.actions.wait_for(selector, DEFAULT_TIMEOUT).await? else {
                warn!("{label} 필드를 찾을 수 없습니다");
                continue;
            };
            self.actions.set_value(area, value, &config).await?;
            if i == last {
                self.actions.dom().blur(area).await?;
                self.actions.pause(80, 150).await;
                debug!("평가계획 입력 완료, UI 커밋 대기 중");
                self.actions
                    .pause(min_field * 3 / 2, max_field * 3 / 2)
                    .await;
            } else {
                self.actions.field_pause(&config).await;
            }
        }

        self.click_body().await?;
        self.actions.pause(100, 200).await;
        info!("필드 설정 완료");
        self.actions.field_pause(&config).await;
        Ok(true)
    }

    #[instrument(skip_all)]
    pub async fn set_eval_text(&self, payload: &SetEvalTextPayload) -> Result<bool, BridgeError> {
        let config = self.merge_config(payload.config.as_ref());
        let area = self
            .navigator
            .eval_textarea()
            .await?
            .ok_or_else(|| BridgeError::handler("평가 필드를 찾을 수 없습니다"))?;

        self.actions
            .set_value(area, &payload.eval_text, &config)
            .await?;
        self.actions.field_pause(&config).await;
        self.actions.dom().blur(area).await?;
        self.click_body().await?;
        self.actions.pause(100, 200).await;
        info!("평가 텍스트 입력 완료");
        Ok(true)
    }

    pub async fn select_row_by_month(
        &self,
        payload: &SelectRowByMonthPayload,
    ) -> Result<bool, BridgeError> {
        self.merge_config(payload.config.as_ref());
        Ok(self
            .navigator
            .select_row_by_month(&payload.month_list(), payload.is_first)
            .await?)
    }

    pub async fn select_row_by_index(
        &self,
        payload: &SelectRowByIndexPayload,
    ) -> Result<bool, BridgeError> {
        self.merge_config(payload.config.as_ref());
        let Some(index) = payload.index else {
            warn!("유효하지 않은 인덱스");
            return Ok(false);
        };
        Ok(self
            .navigator
            .select_row_by_index(index, payload.is_first)
            .await?)
    }

    pub async fn save(&self) -> Result<bool, BridgeError> {
        let button = self
            .actions
            .wait_for(selectors::SAVE_BUTTON, DEFAULT_TIMEOUT)
            .await?
            .ok_or_else(|| BridgeError::handler("저장 버튼을 찾을 수 없습니다"))?;
        self.actions.dom().click(button).await?;
        info!("저장 버튼 클릭 완료");
        self.actions.sleep_ms(800).await;
        Ok(true)
    }

    async fn click_body(&self) -> Result<(), BridgeError> {
        let dom = self.actions.dom();
        if let Some(body) = dom.body().await? {
            dom.click(body).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BridgeHandler for DomHandlers {
    async fn handle(&self, command: BridgeCommand) -> Result<Value, BridgeError> {
        let data = match command {
            BridgeCommand::EnsureApp => self.ensure_app().await?,
            BridgeCommand::DetectPageType => serde_json::to_value(self.detect_page_type().await?)?,
            BridgeCommand::AddRow => json!(self.add_row().await?),
            BridgeCommand::SelectMonth(payload) => json!(self.select_month(&payload).await?),
            BridgeCommand::SetFields(payload) => json!(self.set_fields(&payload).await?),
            BridgeCommand::SetEvalText(payload) => json!(self.set_eval_text(&payload).await?),
            BridgeCommand::SelectRowByMonth(payload) => {
                json!(self.select_row_by_month(&payload).await?)
            }
            BridgeCommand::SelectRowByIndex(payload) => {
                json!(self.select_row_by_index(&payload).await?)
            }
            BridgeCommand::Save => json!(self.save().await?),
            BridgeCommand::EnsureStudent(_) => {
                debug!("학생 선택은 DOM 브리지에서 지원하지 않음");
                serde_json::to_value(StudentSelection::default())?
            }
        };
        Ok(data)
    }
}
