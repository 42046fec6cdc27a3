//! Handlers driving the host framework's component API.

use std::sync::Arc;
use std::time::Duration;

use action_primitives::Clock;
use async_trait::async_trait;
use dom_adapter::{ComponentRef, FrameworkPort};
use nice_core_types::{digits_only, MonthKeyed};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::command::{
    BridgeCommand, EnsureStudentPayload, SelectMonthPayload, SelectedStudent, SetFieldsPayload,
    StudentSelection,
};
use crate::errors::BridgeError;
use crate::responder::BridgeHandler;

/// Application id of the monthly education plan screen.
pub const APP_ID: &str = "edu/sw/els/iep/ss/els_iepss00_m04";

const WAIT_TIMEOUT: Duration = Duration::from_secs(30);
const PLATFORM_POLL: Duration = Duration::from_millis(200);
const APP_POLL: Duration = Duration::from_millis(500);
/// Years from which the month is picked through the combo box.
const COMBO_FROM_YEAR: i64 = 2024;

mod ids {
    pub const GRID: &str = "grdListMnbyIduzEdu";
    pub const DATA_SET: &str = "dsSearchMnbyIduzEduPlan";
    pub const STUDENT_GRID: &str = "grdStuList";
    pub const SEARCH_MAP: &str = "dmSearch";
    pub const MONTH_COMBO: &str = "cmbMnbyIduzEduPlanMmntValue";
    pub const MONTH_INPUT: &str = "ipbMnbyIduzEduPlanMmntValue";
    pub const ADD_ROW_BUTTON: &str = "btnAddRow";
    pub const SAVE_BUTTON: &str = "btnSave";
    pub const MONTH_COLUMN: &str = "mnbyIduzEduMmntValue";
}

/// Text area component and the data set column it is bound to.
const TEXT_FIELDS: [(&str, &str); 4] = [
    ("txaMnbyIduzEduGoalCn", "mnbyIduzEduGoalCn"),
    ("txaMnbyIduzEduCn", "mnbyIduzEduCn"),
    ("txaMnbyIduzEduMthCn", "mnbyIduzEduMthCn"),
    ("txaEvlCriaCn", "evlCriaCn"),
];

#[derive(Clone, Copy, Debug)]
struct Components {
    app: ComponentRef,
    grid: ComponentRef,
    data_set: ComponentRef,
    student_grid: Option<ComponentRef>,
    search_map: Option<ComponentRef>,
    month_combo: Option<ComponentRef>,
    month_input: Option<ComponentRef>,
}

/// Component-API handler set. Components are looked up once per instance.
pub struct AppHandlers {
    framework: Arc<dyn FrameworkPort>,
    clock: Arc<dyn Clock>,
    components: Mutex<Option<Components>>,
}

impl AppHandlers {
    pub fn new(framework: Arc<dyn FrameworkPort>, clock: Arc<dyn Clock>) -> Self {
        Self {
            framework,
            clock,
            components: Mutex::new(None),
        }
    }

    async fn wait_for_platform(&self) -> Result<(), BridgeError> {
        let start = self.clock.elapsed();
        while self.clock.elapsed() - start < WAIT_TIMEOUT {
            if self.framework.platform_available().await? {
                debug!("CPR 프레임워크 감지됨");
                return Ok(());
            }
            self.clock.sleep(PLATFORM_POLL).await;
        }
        error!("CPR 프레임워크를 찾을 수 없습니다");
        Err(BridgeError::handler("CPR framework unavailable"))
    }

    async fn supports_lookup(&self, target: Option<ComponentRef>) -> Result<Option<ComponentRef>, BridgeError> {
        match target {
            Some(target) if self.framework.has_method(target, "lookup").await? => Ok(Some(target)),
            _ => Ok(None),
        }
    }

    async fn find_app(&self) -> Result<Option<ComponentRef>, BridgeError> {
        let Some(platform) = self.framework.platform().await? else {
            return Ok(None);
        };
        if !self.framework.has_method(platform, "lookup").await? {
            warn!("Platform.INSTANCE.lookup이 함수가 아닙니다");
            return Ok(None);
        }
        if let Some(app) = self.supports_lookup(self.framework.application(APP_ID).await?).await? {
            info!(app_id = APP_ID, "앱을 APP_ID로 찾았습니다");
            return Ok(Some(app));
        }
        if self.framework.has_method(platform, "getActiveApplication").await? {
            let active = self.framework.active_application().await?;
            if let Some(app) = self.supports_lookup(active).await? {
                info!("활성 앱을 찾았습니다");
                return Ok(Some(app));
            }
        }
        for probe in [ids::GRID, ids::DATA_SET] {
            if self.framework.lookup(platform, probe).await?.is_some() {
                info!(component = probe, "전역 lookup으로 컴포넌트를 찾았습니다. Platform을 app으로 사용합니다");
                return Ok(Some(platform));
            }
        }
        Ok(None)
    }

    async fn wait_for_app(&self) -> Result<ComponentRef, BridgeError> {
        let start = self.clock.elapsed();
        while self.clock.elapsed() - start < WAIT_TIMEOUT {
            match self.find_app().await {
                Ok(Some(app)) => return Ok(app),
                Ok(None) => self.clock.sleep(APP_POLL).await,
                Err(err) => {
                    error!(error = %err, "waitForApp 오류");
                    self.clock.sleep(PLATFORM_POLL).await;
                }
            }
        }
        Err(BridgeError::handler(
            "Target app not found or app.lookup is not a function",
        ))
    }

    /// Resolve the app and its components on first use.
    #[instrument(skip_all)]
    async fn components(&self) -> Result<Components, BridgeError> {
        let mut cached = self.components.lock().await;
        if let Some(components) = *cached {
            return Ok(components);
        }

        debug!("초기화 시작");
        self.wait_for_platform().await?;
        let app = self.wait_for_app().await?;
        let fw = &self.framework;

        let grid = fw.lookup(app, ids::GRID).await?;
        let data_set = fw.lookup(app, ids::DATA_SET).await?;
        let student_grid = fw.lookup(app, ids::STUDENT_GRID).await?;
        let search_map = fw.lookup(app, ids::SEARCH_MAP).await?;
        let month_combo = fw.lookup(app, ids::MONTH_COMBO).await?;
        let month_input = fw.lookup(app, ids::MONTH_INPUT).await?;
        info!(
            grid = grid.is_some(),
            data_set = data_set.is_some(),
            student_grid = student_grid.is_some(),
            search_map = search_map.is_some(),
            month_combo = month_combo.is_some(),
            month_input = month_input.is_some(),
            "컴포넌트 조회 결과"
        );

        let (Some(grid), Some(data_set)) = (grid, data_set) else {
            return Err(BridgeError::handler(
                "필수 UI 컴포넌트를 찾을 수 없습니다 (grid 또는 dataSet이 없음)",
            ));
        };
        let components = Components {
            app,
            grid,
            data_set,
            student_grid,
            search_map,
            month_combo,
            month_input,
        };
        *cached = Some(components);
        Ok(components)
    }

    /// `target.method(args)` when the method exists, else `None`.
    async fn call_optional(
        &self,
        target: Option<ComponentRef>,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, BridgeError> {
        let Some(target) = target else {
            return Ok(None);
        };
        if !self.framework.has_method(target, method).await? {
            return Ok(None);
        }
        Ok(Some(self.framework.call(target, method, args).await?))
    }

    async fn resolve_row_index(
        &self,
        components: &Components,
        preferred: Option<i64>,
    ) -> Result<Option<i64>, BridgeError> {
        if let Some(index) = preferred.filter(|i| *i >= 0) {
            return Ok(Some(index));
        }
        let selected = self
            .call_optional(Some(components.grid), "getSelectedRowIndex", vec![])
            .await?;
        Ok(selected.and_then(|v| v.as_i64()).filter(|i| *i >= 0))
    }

    pub async fn ensure_app(&self) -> Result<Value, BridgeError> {
        let components = self.components().await?;
        let data_set_rows = self
            .call_optional(Some(components.data_set), "getRowCount", vec![])
            .await?;
        let student_rows = self
            .call_optional(components.student_grid, "getRowCount", vec![])
            .await?;
        Ok(json!({
            "gridReady": true,
            "dataSetRows": data_set_rows,
            "studentRows": student_rows,
        }))
    }

    async fn click_button(&self, id: &str, missing: &str, settle: Duration) -> Result<bool, BridgeError> {
        let components = self.components().await?;
        let button = self
            .framework
            .lookup(components.app, id)
            .await?
            .ok_or_else(|| BridgeError::handler(missing))?;
        self.framework.call(button, "click", vec![]).await?;
        self.clock.sleep(settle).await;
        Ok(true)
    }

    pub async fn add_row(&self) -> Result<bool, BridgeError> {
        info!("행 추가 실행");
        self.click_button(
            ids::ADD_ROW_BUTTON,
            "행추가 버튼을 찾을 수 없습니다",
            Duration::from_millis(500),
        )
        .await
    }

    pub async fn save(&self) -> Result<bool, BridgeError> {
        info!("저장 실행");
        self.click_button(
            ids::SAVE_BUTTON,
            "저장 버튼을 찾을 수 없습니다",
            Duration::from_millis(1000),
        )
        .await
    }

    #[instrument(skip_all)]
    pub async fn select_month(&self, payload: &SelectMonthPayload) -> Result<bool, BridgeError> {
        let components = self.components().await?;
        let cleaned: Vec<String> = payload
            .month_list()
            .iter()
            .filter(|m| !m.is_blank())
            .map(|m| m.as_str().to_string())
            .collect();
        let Some(first) = cleaned.first().cloned() else {
            return Ok(false);
        };

        let year = self
            .call_optional(components.search_map, "getValue", vec![json!("ayr")])
            .await?
            .and_then(|v| as_integer(&v));
        let numeric_month = leading_integer(&first);

        match (year, components.month_combo, components.month_input) {
            (Some(year), Some(combo), _) if year >= COMBO_FROM_YEAR => {
                self.pick_from_combo(combo, numeric_month, &cleaned).await?;
            }
            (_, _, Some(input)) => {
                self.framework
                    .set_property(input, "value", json!(first))
                    .await?;
            }
            _ => debug!("월 입력 컴포넌트 없음"),
        }

        if let Some(row) = self.resolve_row_index(&components, payload.row_index).await? {
            self.call_optional(
                Some(components.data_set),
                "setValue",
                vec![json!(row), json!(ids::MONTH_COLUMN), json!(first)],
            )
            .await?;
        }
        Ok(true)
    }

    async fn pick_from_combo(
        &self,
        combo: ComponentRef,
        numeric_month: Option<i64>,
        cleaned: &[String],
    ) -> Result<(), BridgeError> {
        let joined = cleaned.join(", ");
        let can_open = self.framework.has_method(combo, "open").await?;
        let Some(month) = numeric_month.filter(|_| can_open) else {
            self.framework.set_property(combo, "value", json!(joined)).await?;
            return Ok(());
        };

        self.framework.call(combo, "open", vec![]).await?;
        let items = self
            .call_optional(Some(combo), "getItems", vec![])
            .await?
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default();
        let wanted = month.to_string();
        let target = items.iter().find(|item| {
            let label = item
                .get("label")
                .filter(|v| !v.is_null())
                .or_else(|| item.get("content"))
                .map(js_string)
                .unwrap_or_default();
            digits_only(&label) == wanted
        });

        match target {
            Some(item) => {
                let value = item
                    .get("value")
                    .filter(|v| !v.is_null())
                    .or_else(|| item.get("label").filter(|v| !v.is_null()))
                    .cloned()
                    .unwrap_or_else(|| json!(cleaned[0]));
                self.framework.call(combo, "selectItem", vec![value]).await?;
            }
            None => {
                self.framework.set_property(combo, "value", json!(joined)).await?;
            }
        }
        Ok(())
    }

    /// Write the four text areas and their data set columns.
    #[instrument(skip_all)]
    pub async fn set_fields(&self, payload: &SetFieldsPayload) -> Result<bool, BridgeError> {
        let components = self.components().await?;
        let row = self.resolve_row_index(&components, payload.row_index).await?;
        debug!(row_index = ?row, "필드 설정 중");

        let values = [
            payload.goal.as_str(),
            payload.content.as_str(),
            payload.method.as_str(),
            payload.evaluation.as_str(),
        ];
        for ((component, column), value) in TEXT_FIELDS.iter().zip(values) {
            let Some(area) = self.framework.lookup(components.app, component).await? else {
                continue;
            };
            self.framework.set_property(area, "value", json!(value)).await?;
            if let Some(row) = row {
                self.call_optional(
                    Some(components.data_set),
                    "setValue",
                    vec![json!(row), json!(column), json!(value)],
                )
                .await?;
            }
        }
        info!("필드 설정 완료");
        Ok(true)
    }

    /// Select the first student row matching the given name and number.
    pub async fn ensure_student(
        &self,
        payload: &EnsureStudentPayload,
    ) -> Result<StudentSelection, BridgeError> {
        let components = self.components().await?;
        let Some(student_grid) = components.student_grid else {
            return Ok(StudentSelection::default());
        };
        let Some(rows) = self
            .call_optional(Some(student_grid), "getRowCount", vec![])
            .await?
        else {
            return Ok(StudentSelection::default());
        };
        let target_name = payload.name.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let target_number = payload.number.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let count = as_integer(&rows).unwrap_or(0);
        for index in 0..count {
            let row = self
                .framework
                .call_object(student_grid, "getRow", vec![json!(index)])
                .await?;
            let name = self.row_text(row, "stuFlnm").await?;
            let number = self.row_text(row, "clsNo").await?;

            let name_matches = target_name.map_or(true, |t| t == name);
            let number_matches = target_number.map_or(true, |t| t == number);
            if name_matches && number_matches {
                self.framework
                    .call(student_grid, "selectRow", vec![json!(index)])
                    .await?;
                info!(index, name = %name, number = %number, "학생 선택 완료");
                return Ok(StudentSelection {
                    selected: Some(SelectedStudent {
                        index: index as u64,
                        name,
                        number,
                    }),
                });
            }
        }
        Ok(StudentSelection::default())
    }

    async fn row_text(&self, row: Option<ComponentRef>, column: &str) -> Result<String, BridgeError> {
        let value = self
            .call_optional(row, "getValue", vec![json!(column)])
            .await?
            .unwrap_or(Value::Null);
        Ok(js_string(&value).trim().to_string())
    }
}

#[async_trait]
impl BridgeHandler for AppHandlers {
    async fn handle(&self, command: BridgeCommand) -> Result<Value, BridgeError> {
        let data = match command {
            BridgeCommand::EnsureApp => self.ensure_app().await?,
            BridgeCommand::AddRow => json!(self.add_row().await?),
            BridgeCommand::SelectMonth(payload) => json!(self.select_month(&payload).await?),
            BridgeCommand::SetFields(payload) => json!(self.set_fields(&payload).await?),
            BridgeCommand::Save => json!(self.save().await?),
            BridgeCommand::EnsureStudent(payload) => {
                serde_json::to_value(self.ensure_student(&payload).await?)?
            }
            unsupported @ (BridgeCommand::DetectPageType
            | BridgeCommand::SetEvalText(_)
            | BridgeCommand::SelectRowByMonth(_)
            | BridgeCommand::SelectRowByIndex(_)) => {
                return Err(BridgeError::Unsupported(unsupported.action().to_string()));
            }
        };
        Ok(data)
    }
}

/// `String(value)` for the JSON values components hand back.
fn js_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => leading_integer(s),
        _ => None,
    }
}

/// `parseInt(s, 10)`: optional sign and leading digits.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_semantics() {
        assert_eq!(leading_integer("9월"), Some(9));
        assert_eq!(leading_integer(" 12"), Some(12));
        assert_eq!(leading_integer("월9"), None);
        assert_eq!(as_integer(&json!("2025")), Some(2025));
        assert_eq!(as_integer(&json!(2024.0)), Some(2024));
    }

    #[test]
    fn js_string_of_numbers() {
        assert_eq!(js_string(&json!(7)), "7");
        assert_eq!(js_string(&Value::Null), "");
    }
}
