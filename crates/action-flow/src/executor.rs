//! Batch executor: drives one plan or evaluation batch through the bridge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use action_primitives::Clock;
use async_trait::async_trait;
use dom_adapter::DomPort;
use nice_core_types::{
    sort_by_academic_month, EvalRecord, InputConfig, InputConfigPatch, MonthKeyed, PlanRecord,
};
use nice_event_bus::{emit, StatusBus, StatusEvent};
use page_bridge::{
    BridgeClient, BridgeCommand, BridgeError, EnsureStudentPayload, SelectMonthPayload,
    SelectRowByIndexPayload, SelectedStudent, SetEvalTextPayload, SetFieldsPayload,
    StudentSelection,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::FlowError;
use crate::strategies::RetryPolicy;
use crate::types::{BatchMode, BatchPayload, BatchResult, RecordOutcome, StudentFilter};

const POPUP_CLOSE_WAIT: Duration = Duration::from_millis(300);
const FOCUS_SETTLE: Duration = Duration::from_millis(150);

/// JSON copy of a batch, kept for `getCurrentPlans`.
fn snapshot<R: Serialize>(records: &[R]) -> Result<Vec<Value>, FlowError> {
    records
        .iter()
        .map(|record| serde_json::to_value(record).map_err(FlowError::from))
        .collect()
}

/// Content-side orchestrator. One instance per attached tab.
pub struct BatchExecutor {
    client: BridgeClient,
    dom: Arc<dyn DomPort>,
    clock: Arc<dyn Clock>,
    bus: Arc<StatusBus>,
    cancel: CancellationToken,
    initialized: AtomicBool,
    current_student: Mutex<Option<SelectedStudent>>,
    current_plans: Mutex<Vec<Value>>,
}

/// One record kind the batch loop knows how to fill.
#[async_trait]
trait FillRecord: MonthKeyed + Serialize + Send + Sync {
    async fn fill(
        &self,
        executor: &BatchExecutor,
        index: usize,
        config: &InputConfig,
    ) -> Result<(), BridgeError>;

    fn describe(&self) -> String {
        self.month_list()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[async_trait]
impl FillRecord for PlanRecord {
    async fn fill(
        &self,
        executor: &BatchExecutor,
        _index: usize,
        config: &InputConfig,
    ) -> Result<(), BridgeError> {
        executor.fill_plan(self, config).await
    }
}

#[async_trait]
impl FillRecord for EvalRecord {
    async fn fill(
        &self,
        executor: &BatchExecutor,
        index: usize,
        config: &InputConfig,
    ) -> Result<(), BridgeError> {
        executor.fill_evaluation(self, index, config).await
    }
}

impl BatchExecutor {
    pub fn new(
        client: BridgeClient,
        dom: Arc<dyn DomPort>,
        clock: Arc<dyn Clock>,
        bus: Arc<StatusBus>,
    ) -> Self {
        Self {
            client,
            dom,
            clock,
            bus,
            cancel: CancellationToken::new(),
            initialized: AtomicBool::new(false),
            current_student: Mutex::new(None),
            current_plans: Mutex::new(Vec::new()),
        }
    }

    /// Batches stop before the next record once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &BridgeClient {
        &self.client
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Student picked by the last `ensureStudent` that matched.
    pub fn current_student(&self) -> Option<SelectedStudent> {
        self.current_student.lock().clone()
    }

    /// Records of the most recent batch, as received.
    pub fn current_plans(&self) -> Vec<Value> {
        self.current_plans.lock().clone()
    }

    /// One `ensureApp` round trip.
    pub async fn init(&self) -> bool {
        match self.client.send(&BridgeCommand::EnsureApp).await {
            Ok(status) => {
                info!(bridge = %status, "브리지 초기화 정보");
                self.initialized.store(true, Ordering::SeqCst);
                true
            }
            Err(err) => {
                error!(error = %err, "브리지 초기화 실패");
                false
            }
        }
    }

    /// `init` under a retry budget.
    pub async fn initialize(&self, policy: &RetryPolicy) -> bool {
        let ok = policy
            .run(self.clock.as_ref(), &self.cancel, |_| self.init())
            .await;
        if ok {
            info!("사용 준비 완료");
        } else {
            error!("초기화 최종 실패");
        }
        ok
    }

    async fn ensure_initialized(&self, mode: BatchMode) -> Result<(), FlowError> {
        if self.is_initialized() {
            return Ok(());
        }
        info!("초기화 시작");
        if self.initialize(&RetryPolicy::ON_DEMAND).await {
            Ok(())
        } else {
            Err(FlowError::InitFailed(mode.page()))
        }
    }

    /// Select the named student. Never fails the batch.
    pub async fn ensure_student(&self, filter: Option<&StudentFilter>) {
        let Some(filter) = filter.filter(|f| !f.is_empty()) else {
            return;
        };
        let command = BridgeCommand::EnsureStudent(EnsureStudentPayload {
            name: filter.student_name.clone(),
            number: filter.student_number.clone(),
        });
        match self.client.request::<StudentSelection>(&command).await {
            Ok(StudentSelection {
                selected: Some(student),
            }) => {
                info!(index = student.index, name = %student.name, "학생 선택 완료");
                *self.current_student.lock() = Some(student);
            }
            Ok(StudentSelection { selected: None }) => {
                warn!("조건에 맞는 학생을 찾지 못했습니다");
            }
            Err(err) => error!(error = %err, "학생 선택 실패"),
        }
    }

    #[instrument(skip_all, fields(records = payload.plans.len()))]
    pub async fn fill_plans(&self, payload: BatchPayload<PlanRecord>) -> Result<BatchResult, FlowError> {
        self.run_batch(BatchMode::Plans, payload).await
    }

    #[instrument(skip_all, fields(records = payload.plans.len()))]
    pub async fn fill_evaluations(
        &self,
        payload: BatchPayload<EvalRecord>,
    ) -> Result<BatchResult, FlowError> {
        self.run_batch(BatchMode::Evaluations, payload).await
    }

    async fn run_batch<R: FillRecord>(
        &self,
        mode: BatchMode,
        payload: BatchPayload<R>,
    ) -> Result<BatchResult, FlowError> {
        self.ensure_initialized(mode).await?;
        if payload.plans.is_empty() {
            return Err(FlowError::EmptyBatch(mode.page()));
        }
        *self.current_plans.lock() = snapshot(&payload.plans)?;
        self.ensure_student(payload.filters.as_ref()).await;

        let config = payload.config();
        let mut records = payload.plans;
        sort_by_academic_month(&mut records);
        let total = records.len();
        let order: Vec<String> = records.iter().map(FillRecord::describe).collect();
        info!(
            mode = ?mode,
            total,
            speed = %config.speed,
            human_mode = config.human_mode,
            order = %order.join(" → "),
            "일괄 입력 시작"
        );

        self.focus_page().await?;

        let between = Duration::from_millis(config.profile().between_records_ms);
        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;
        for (index, record) in records.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(done = index, total, "일괄 입력이 취소되었습니다");
                cancelled = true;
                break;
            }
            emit(self.bus.as_ref(), StatusEvent::progress(index, total)).await;
            debug!(index, months = %record.describe(), "항목 입력 중");
            let outcome = match record.fill(self, index, &config).await {
                Ok(()) => RecordOutcome::ok(),
                Err(err) => {
                    error!(index, error = %err, "항목 입력 실패");
                    RecordOutcome::failed(err.to_string())
                }
            };
            results.push(outcome);
            self.clock.sleep(between).await;
        }

        if !cancelled {
            if let Err(err) = self.client.send(&BridgeCommand::Save).await {
                error!(error = %err, "최종 저장 실패");
            }
            emit(self.bus.as_ref(), StatusEvent::progress(total, total)).await;
        }

        let result = BatchResult::from_outcomes(results, total, cancelled);
        info!(
            success = result.success_count,
            total = result.total_count,
            "일괄 입력 완료"
        );
        Ok(result)
    }

    /// Give the popup time to close, then put focus on the page.
    async fn focus_page(&self) -> Result<(), FlowError> {
        self.clock.sleep(POPUP_CLOSE_WAIT).await;
        match self.dom.body().await {
            Ok(Some(body)) => {
                if let Err(err) = self.dom.click(body).await {
                    warn!(error = %err, "body 클릭 실패");
                }
            }
            Ok(None) => warn!("body 요소가 없습니다"),
            Err(err) => return Err(FlowError::Bridge(err.into())),
        }
        self.clock.sleep(FOCUS_SETTLE).await;
        Ok(())
    }

    async fn fill_plan(&self, record: &PlanRecord, config: &InputConfig) -> Result<(), BridgeError> {
        self.client.send(&BridgeCommand::AddRow).await?;

        if !record.months.is_empty() {
            info!(months = %record.describe(), "그룹 월 계획 입력 중");
            self.client
                .send(&BridgeCommand::SelectMonth(SelectMonthPayload {
                    months: record.months.clone(),
                    ..SelectMonthPayload::default()
                }))
                .await?;
        } else if let Some(month) = record.month.clone() {
            info!(month = %month, "단일 월 계획 입력 중");
            self.client
                .send(&BridgeCommand::SelectMonth(SelectMonthPayload {
                    month: Some(month),
                    ..SelectMonthPayload::default()
                }))
                .await?;
        }

        self.client
            .send(&BridgeCommand::SetFields(SetFieldsPayload {
                row_index: None,
                goal: record.goal.clone(),
                content: record.content.clone(),
                method: record.method.clone(),
                evaluation: record.evaluation.clone(),
                config: Some(InputConfigPatch::from(*config)),
            }))
            .await?;
        Ok(())
    }

    async fn fill_evaluation(
        &self,
        record: &EvalRecord,
        index: usize,
        config: &InputConfig,
    ) -> Result<(), BridgeError> {
        let is_first = index == 0;
        info!(ordinal = index + 1, months = %record.describe(), is_first, "평가 입력 중");
        self.client
            .send(&BridgeCommand::SelectRowByIndex(SelectRowByIndexPayload {
                index: Some(index as i64),
                config: Some(InputConfigPatch::from(*config)),
                is_first,
            }))
            .await?;

        if !record.eval_text.is_empty() {
            self.client
                .send(&BridgeCommand::SetEvalText(SetEvalTextPayload {
                    eval_text: record.eval_text.clone(),
                    config: Some(InputConfigPatch::from(*config)),
                }))
                .await?;
        }
        Ok(())
    }
}
