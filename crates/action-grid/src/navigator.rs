//! Row selection by month or ordinal in virtualized grids.

use std::sync::Arc;

use action_primitives::ActionPrimitives;
use dom_adapter::{DomError, DomEvent, DomPort, KeyInput, MouseKind, NodeId, ScrollBlock};
use nice_core_types::{academic_value, digits_only, MonthValue};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::errors::GridError;
use crate::selectors;

/// Scroll attempts before a month is declared absent.
pub const MAX_SCROLL_ATTEMPTS: usize = 10;

const SCROLL_STEP_PX: f64 = 150.0;
const WHEEL_DELTA_Y: f64 = 100.0;
const SCROLL_TIMES_PER_ATTEMPT: usize = 2;

pub struct GridNavigator {
    actions: ActionPrimitives,
    last_selected: Mutex<Option<NodeId>>,
}

impl GridNavigator {
    pub fn new(actions: ActionPrimitives) -> Self {
        Self {
            actions,
            last_selected: Mutex::new(None),
        }
    }

    fn dom(&self) -> &Arc<dyn DomPort> {
        self.actions.dom()
    }

    /// Row most recently selected by this navigator.
    pub fn last_selected(&self) -> Option<NodeId> {
        *self.last_selected.lock()
    }

    fn remember(&self, row: NodeId) {
        *self.last_selected.lock() = Some(row);
    }

    async fn trimmed_text(&self, node: NodeId) -> Result<String, GridError> {
        Ok(self.dom().text_content(node).await?.trim().to_string())
    }

    /// Visible row holding `month`, if any.
    pub async fn find_month_row(&self, month: &str) -> Result<Option<NodeId>, GridError> {
        let target = digits_only(month);
        if target.is_empty() {
            return Ok(None);
        }
        let rows = self.dom().query_all(None, selectors::ROW).await?;
        for row in rows {
            if let Some(cell) = self.dom().query(Some(row), selectors::MONTH_CELL).await? {
                if digits_only(&self.trimmed_text(cell).await?) == target {
                    return Ok(Some(row));
                }
            }
            for cell in self.dom().query_all(Some(row), selectors::GRID_CELL).await? {
                let text = self.trimmed_text(cell).await?;
                let short_number =
                    (1..=2).contains(&text.len()) && text.chars().all(|c| c.is_ascii_digit());
                if short_number && text == target {
                    return Ok(Some(row));
                }
            }
        }
        Ok(None)
    }

    /// Month numbers shown in the month column of currently rendered rows.
    pub async fn visible_months(&self) -> Result<Vec<u32>, GridError> {
        let mut months = Vec::new();
        for row in self.dom().query_all(None, selectors::ROW).await? {
            if let Some(cell) = self.dom().query(Some(row), selectors::MONTH_CELL).await? {
                let text = self.trimmed_text(cell).await?;
                if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
                    if let Ok(month) = text.parse() {
                        months.push(month);
                    }
                }
            }
        }
        Ok(months)
    }

    async fn scrollable_div_in_grid(&self, grid: NodeId) -> Result<Option<NodeId>, GridError> {
        for div in self.dom().query_all(Some(grid), "div").await? {
            if self.dom().scroll_metrics(div).await?.is_scrollable() {
                return Ok(Some(div));
            }
        }
        Ok(None)
    }

    async fn scrollable_ancestor(&self, row: NodeId) -> Result<Option<NodeId>, GridError> {
        let body = self.dom().body().await?;
        let mut current = self.dom().parent(row).await?;
        while let Some(node) = current {
            if Some(node) == body {
                break;
            }
            if self.dom().scroll_metrics(node).await?.is_scrollable() {
                return Ok(Some(node));
            }
            current = self.dom().parent(node).await?;
        }
        Ok(None)
    }

    /// Scroll the grid down by `times` steps and give it time to render.
    #[instrument(skip(self))]
    pub async fn scroll_down(&self, times: usize) -> Result<(), GridError> {
        let rows = self.dom().query_all(None, selectors::ROW).await?;
        let Some(&last_row) = rows.last() else {
            return Ok(());
        };
        let grid = self.dom().query(None, selectors::GRID).await?;

        let mut container = match grid {
            Some(grid) => self.scrollable_div_in_grid(grid).await?,
            None => None,
        };
        if container.is_none() {
            container = self.scrollable_ancestor(last_row).await?;
        }

        match container {
            Some(container) => {
                let metrics = self.dom().scroll_metrics(container).await?;
                let target = metrics.scroll_top + SCROLL_STEP_PX * times as f64;
                debug!(from = metrics.scroll_top, to = target, "scrollTop 조작");
                self.dom().set_scroll_top(container, target).await?;
                self.dom().dispatch(container, DomEvent::Scroll).await?;
            }
            None => {
                debug!("스크롤 컨테이너 못 찾음, 마지막 행을 위로 스크롤");
                self.dom()
                    .scroll_into_view(last_row, ScrollBlock::Start)
                    .await?;
            }
        }
        self.actions.sleep_ms(200).await;

        let wheel_target = container.or(grid).unwrap_or(last_row);
        for _ in 0..times {
            self.dom()
                .dispatch(
                    wheel_target,
                    DomEvent::Wheel {
                        delta_y: WHEEL_DELTA_Y,
                    },
                )
                .await?;
            self.actions.sleep_ms(50).await;
        }

        self.actions.sleep_ms(500).await;
        Ok(())
    }

    /// Best-effort reset of the grid to its first row.
    #[instrument(skip(self))]
    pub async fn scroll_to_top(&self) -> Result<(), GridError> {
        let grid = self.dom().query(None, selectors::GRID).await?;

        if let Some(grid) = grid {
            if let Some(container) = self.scrollable_div_in_grid(grid).await? {
                self.dom().set_scroll_top(container, 0.0).await?;
                self.dom().dispatch(container, DomEvent::Scroll).await?;
                self.actions.sleep_ms(300).await;
            }
        }

        for row in self.dom().query_all(None, selectors::ROW).await? {
            let Some(first_cell) = self.dom().query(Some(row), selectors::GRID_CELL).await? else {
                continue;
            };
            if self.trimmed_text(first_cell).await? == "1" {
                self.dom().scroll_into_view(row, ScrollBlock::Center).await?;
                self.actions.sleep_ms(300).await;
                break;
            }
        }

        if let Some(grid) = grid {
            self.dom()
                .dispatch(grid, DomEvent::KeyDown(KeyInput::named("Home")))
                .await?;
            self.actions.sleep_ms(200).await;
        }
        Ok(())
    }

    /// Click the most identifying cell of `row` with a full mouse sequence.
    pub async fn click_row_cell(&self, row: NodeId) -> Result<bool, GridError> {
        let mut target = self.dom().query(Some(row), selectors::ORDINAL_CELL).await?;
        if target.is_none() {
            target = self.dom().query(Some(row), selectors::MONTH_CELL).await?;
        }
        if target.is_none() {
            target = self.dom().query(Some(row), selectors::GRID_CELL).await?;
        }
        let Some(cell) = target else {
            warn!("클릭할 셀을 찾을 수 없습니다");
            return Ok(false);
        };

        self.dom().scroll_into_view(cell, ScrollBlock::Center).await?;
        self.actions.sleep_ms(100).await;

        let (x, y) = self.dom().bounding_rect(cell).await?.center();
        let sequence = [
            (MouseKind::MouseDown, 50),
            (MouseKind::MouseUp, 50),
            (MouseKind::Click, 100),
            (MouseKind::DblClick, 300),
        ];
        for (button, pause_ms) in sequence {
            self.dom()
                .dispatch(cell, DomEvent::Mouse { button, x, y })
                .await?;
            self.actions.sleep_ms(pause_ms).await;
        }

        self.remember(row);
        debug!(row = %row, "행 클릭 완료");
        Ok(true)
    }

    /// Find and click the row for `month`, scrolling up to
    /// [`MAX_SCROLL_ATTEMPTS`] times. Exhaustion returns `false`.
    #[instrument(skip(self))]
    pub async fn select_month_row(&self, month: u32, reset_scroll: bool) -> Result<bool, GridError> {
        if reset_scroll {
            self.scroll_to_top().await?;
        }

        let key = month.to_string();
        if let Some(row) = self.find_month_row(&key).await? {
            return self.click_row_cell(row).await;
        }

        let target_value = academic_value(month);
        for attempt in 1..=MAX_SCROLL_ATTEMPTS {
            debug!(attempt, "{month}월 행 안 보임, 스크롤");
            self.scroll_down(SCROLL_TIMES_PER_ATTEMPT).await?;

            if let Some(row) = self.find_month_row(&key).await? {
                info!(attempt, "{month}월 행 찾음");
                return self.click_row_cell(row).await;
            }

            if attempt == 1 {
                let visible = self.visible_months().await?;
                let max_visible = visible.into_iter().map(academic_value).max();
                if max_visible.is_some_and(|max| max > target_value) {
                    debug!("대상 월({month})을 지나침, 맨 위로 이동 후 재시도");
                    self.scroll_to_top().await?;
                }
            }
        }

        warn!("{month}월 행을 찾을 수 없습니다 ({MAX_SCROLL_ATTEMPTS}회 스크롤 후)");
        Ok(false)
    }

    /// Select the row of the academically earliest month in `months`.
    pub async fn select_row_by_month(
        &self,
        months: &[MonthValue],
        is_first: bool,
    ) -> Result<bool, GridError> {
        let mut numbers: Vec<u32> = months
            .iter()
            .map(MonthValue::digits)
            .filter(|d| !d.is_empty())
            .filter_map(|d| d.parse().ok())
            .collect();
        if numbers.is_empty() {
            warn!("선택할 월이 없습니다");
            return Ok(false);
        }
        numbers.sort_by_key(|m| academic_value(*m));
        self.select_month_row(numbers[0], is_first).await
    }

    async fn selected_eval_row(&self, data_area: NodeId) -> Result<Option<NodeId>, GridError> {
        Ok(self
            .dom()
            .query(Some(data_area), selectors::EVAL_SELECTED_ROW)
            .await?)
    }

    /// Select the `index`-th (zero based) evaluation row.
    ///
    /// The first record clicks the first rendered data row. Later records
    /// click the selected row and press ArrowDown; when the new selection
    /// cannot be read back the clicked row is kept and the step still
    /// counts as done.
    #[instrument(skip(self))]
    pub async fn select_row_by_index(&self, index: i64, is_first: bool) -> Result<bool, GridError> {
        if index < 0 {
            warn!(index, "유효하지 않은 인덱스");
            return Ok(false);
        }
        let Some(grid) = self.dom().query(None, selectors::EVAL_GRID).await? else {
            warn!("월별평가 그리드를 찾을 수 없습니다");
            return Ok(false);
        };
        let Some(data_area) = self
            .dom()
            .query(Some(grid), selectors::EVAL_DATA_AREA)
            .await?
        else {
            warn!("데이터 영역을 찾을 수 없습니다");
            return Ok(false);
        };

        if is_first {
            self.actions.sleep_ms(300).await;
            let Some(first_row) = self.dom().query(Some(data_area), selectors::ROW).await? else {
                warn!("순번 1번 행을 찾을 수 없습니다");
                return Ok(false);
            };
            self.dom().click(first_row).await?;
            self.actions.sleep_ms(500).await;
            self.remember(first_row);
            info!(number = 1, "행 선택 완료");
            return Ok(true);
        }

        let Some(current) = self.selected_eval_row(data_area).await? else {
            warn!("현재 선택된 행을 찾을 수 없습니다");
            return Ok(false);
        };
        self.dom().click(current).await?;
        self.actions.sleep_ms(300).await;
        self.dom()
            .dispatch(current, DomEvent::KeyDown(KeyInput::named("ArrowDown")))
            .await?;
        self.actions.sleep_ms(500).await;

        match self.selected_eval_row(data_area).await? {
            Some(selected) => {
                self.remember(selected);
                info!(number = index + 1, "행 선택 완료 (ArrowDown)");
            }
            None => {
                warn!(number = index + 1, "선택된 행을 확인할 수 없지만 ArrowDown 실행됨");
                self.remember(current);
            }
        }
        Ok(true)
    }

    async fn last_textarea_in(&self, scope: NodeId) -> Result<Option<NodeId>, GridError> {
        Ok(self
            .dom()
            .query_all(Some(scope), selectors::TEXTAREA)
            .await?
            .last()
            .copied())
    }

    /// Locate the evaluation text area for the current row.
    pub async fn eval_textarea(&self) -> Result<Option<NodeId>, GridError> {
        if let Some(row) = self.last_selected() {
            // a collected handle means the row is gone, same as detached
            let connected = match self.dom().is_connected(row).await {
                Ok(connected) => connected,
                Err(DomError::StaleNode(_)) => false,
                Err(err) => return Err(err.into()),
            };
            if connected {
                if let Some(area) = self.last_textarea_in(row).await? {
                    debug!("선택된 행 내 textarea 사용");
                    return Ok(Some(area));
                }
            }
        }

        if let Some(row) = self.dom().query(None, selectors::SELECTED_ROW).await? {
            if let Some(area) = self.last_textarea_in(row).await? {
                debug!("aria-selected 행 내 textarea 사용");
                return Ok(Some(area));
            }
        }

        if let Some(active) = self.dom().active_element().await? {
            if let Some(row) = self.dom().closest(active, selectors::ROW).await? {
                if let Some(area) = self.last_textarea_in(row).await? {
                    debug!("포커스 행 내 textarea 사용");
                    return Ok(Some(area));
                }
            }
        }

        let labelled = self
            .dom()
            .query_all(None, selectors::EVAL_PLAN_TEXTAREA)
            .await?;
        if let Some(area) = labelled.last() {
            return Ok(Some(*area));
        }

        let all = self.dom().query_all(None, selectors::TEXTAREA).await?;
        for area in all.into_iter().rev() {
            if self.dom().value(area).await?.is_empty() {
                debug!("마지막 빈 textarea 사용");
                return Ok(Some(area));
            }
        }
        Ok(None)
    }
}
