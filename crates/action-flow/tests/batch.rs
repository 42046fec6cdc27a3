use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use action_flow::{BatchExecutor, BatchPayload, FlowError, RetryPolicy, StudentFilter};
use action_primitives::ManualClock;
use async_trait::async_trait;
use dom_adapter::memory::MemoryDom;
use nice_core_types::{EvalRecord, InputConfig, PlanRecord, Speed};
use nice_event_bus::{EventBus, InMemoryBus, StatusBus, StatusEvent};
use page_bridge::{
    BridgeClient, BridgeCommand, BridgeError, BridgeHandler, BridgeResponder, BridgeVariant,
    Window,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Page side that records every command and fails on request.
#[derive(Default)]
struct ScriptedPage {
    commands: Mutex<Vec<BridgeCommand>>,
    ensure_app_failures: AtomicUsize,
    fail_goal: Option<&'static str>,
    fail_save: bool,
}

impl ScriptedPage {
    fn actions(&self) -> Vec<&'static str> {
        self.commands.lock().iter().map(BridgeCommand::action).collect()
    }

    fn count(&self, action: &str) -> usize {
        self.actions().into_iter().filter(|a| *a == action).count()
    }
}

#[async_trait]
impl BridgeHandler for ScriptedPage {
    async fn handle(&self, command: BridgeCommand) -> Result<Value, BridgeError> {
        self.commands.lock().push(command.clone());
        match command {
            BridgeCommand::EnsureApp => {
                let left = self.ensure_app_failures.load(Ordering::SeqCst);
                if left > 0 {
                    self.ensure_app_failures.store(left - 1, Ordering::SeqCst);
                    return Err(BridgeError::handler("월별계획 페이지를 찾을 수 없습니다"));
                }
                Ok(json!(true))
            }
            BridgeCommand::SetFields(payload) if Some(payload.goal.as_str()) == self.fail_goal => {
                Err(BridgeError::handler("field not found"))
            }
            BridgeCommand::Save if self.fail_save => {
                Err(BridgeError::handler("저장 버튼을 찾을 수 없습니다"))
            }
            BridgeCommand::EnsureStudent(payload) => Ok(json!({
                "selected": {"index": 4, "name": payload.name, "number": payload.number}
            })),
            _ => Ok(json!(true)),
        }
    }
}

struct Harness {
    page: Arc<ScriptedPage>,
    executor: BatchExecutor,
    clock: Arc<ManualClock>,
    dom: MemoryDom,
    events: broadcast::Receiver<StatusEvent>,
    _stop: CancellationToken,
}

fn harness(page: ScriptedPage) -> Harness {
    let page = Arc::new(page);
    let window = Window::new();
    let stop = CancellationToken::new();
    BridgeResponder::new(window.clone(), BridgeVariant::Dom, page.clone()).spawn(stop.clone());

    let dom = MemoryDom::new();
    let clock = Arc::new(ManualClock::new());
    let bus: Arc<StatusBus> = InMemoryBus::new(64);
    let events = bus.subscribe();
    let executor = BatchExecutor::new(
        BridgeClient::new(window, BridgeVariant::Dom),
        Arc::new(dom.clone()),
        clock.clone(),
        bus,
    );
    Harness {
        page,
        executor,
        clock,
        dom,
        events,
        _stop: stop,
    }
}

fn plan(month: u8, goal: &str) -> PlanRecord {
    PlanRecord {
        goal: goal.to_string(),
        ..PlanRecord::for_month(month)
    }
}

fn progress(events: &mut broadcast::Receiver<StatusEvent>) -> Vec<(usize, usize)> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let StatusEvent::Progress { current, total } = event {
            seen.push((current, total));
        }
    }
    seen
}

#[tokio::test]
async fn plans_run_in_school_year_order_and_save_once() {
    let mut h = harness(ScriptedPage::default());
    let payload = BatchPayload::new(vec![plan(5, "five"), plan(3, "three")], InputConfig::default());

    let result = h.executor.fill_plans(payload).await.unwrap();
    assert!(result.success);
    assert_eq!((result.success_count, result.total_count), (2, 2));
    assert_eq!(progress(&mut h.events), vec![(0, 2), (1, 2), (2, 2)]);

    let goals: Vec<String> = h
        .page
        .commands
        .lock()
        .iter()
        .filter_map(|c| match c {
            BridgeCommand::SetFields(p) => Some(p.goal.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(goals, vec!["three", "five"]);
    assert_eq!(
        h.page.actions(),
        vec![
            "ensureApp",
            "addRow",
            "selectMonth",
            "setFields",
            "addRow",
            "selectMonth",
            "setFields",
            "save"
        ]
    );
}

#[tokio::test]
async fn failing_record_is_reported_and_save_still_runs() {
    let mut h = harness(ScriptedPage {
        fail_goal: Some("bad"),
        ..ScriptedPage::default()
    });
    let payload = BatchPayload::new(
        vec![plan(3, "ok"), plan(4, "bad"), plan(5, "ok")],
        InputConfig::default(),
    );

    let result = h.executor.fill_plans(payload).await.unwrap();
    assert!(!result.success);
    assert_eq!((result.success_count, result.total_count), (2, 3));
    assert_eq!(result.results[1].error.as_deref(), Some("field not found"));
    assert!(result.results[0].success && result.results[2].success);
    assert_eq!(h.page.count("save"), 1);
    assert_eq!(progress(&mut h.events).last(), Some(&(3, 3)));
}

#[tokio::test]
async fn save_failure_is_only_logged() {
    let h = harness(ScriptedPage {
        fail_save: true,
        ..ScriptedPage::default()
    });
    let result = h
        .executor
        .fill_plans(BatchPayload::new(vec![plan(3, "ok")], InputConfig::default()))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(h.page.count("save"), 1);
}

#[tokio::test]
async fn startup_focuses_the_body_and_paces_records() {
    let h = harness(ScriptedPage::default());
    let config = InputConfig {
        speed: Speed::Slow,
        human_mode: false,
    };
    h.executor
        .fill_plans(BatchPayload::new(vec![plan(3, "a"), plan(4, "b")], config))
        .await
        .unwrap();

    assert_eq!(h.dom.names_for(h.dom.body_id()), vec!["click"]);
    let ms: Vec<u64> = h.clock.sleeps().iter().map(|d| d.as_millis() as u64).collect();
    // init wait, popup close, focus settle, then one gap per record
    assert_eq!(ms, vec![1000, 300, 150, 400, 400]);

    let configs: Vec<Value> = h
        .page
        .commands
        .lock()
        .iter()
        .filter_map(|c| match c {
            BridgeCommand::SetFields(p) => serde_json::to_value(p.config).ok(),
            _ => None,
        })
        .collect();
    assert_eq!(configs[0], json!({"speed": "slow", "humanMode": false}));
}

#[tokio::test]
async fn evaluations_select_rows_by_ordinal() {
    let h = harness(ScriptedPage::default());
    let payload = BatchPayload::new(
        vec![
            EvalRecord::new(2, "feb"),
            EvalRecord::new(3, ""),
            EvalRecord::new(12, "dec"),
        ],
        InputConfig::default(),
    );
    let result = h.executor.fill_evaluations(payload).await.unwrap();
    assert!(result.success);

    let commands = h.page.commands.lock().clone();
    let steps: Vec<String> = commands
        .iter()
        .filter_map(|c| match c {
            BridgeCommand::SelectRowByIndex(p) => {
                Some(format!("row {} first={}", p.index.unwrap_or(-1), p.is_first))
            }
            BridgeCommand::SetEvalText(p) => Some(format!("text {}", p.eval_text)),
            _ => None,
        })
        .collect();
    assert_eq!(
        steps,
        vec![
            "row 0 first=true",
            "row 1 first=false",
            "text dec",
            "row 2 first=false",
            "text feb"
        ]
    );
    assert_eq!(h.page.count("save"), 1);
}

#[tokio::test]
async fn empty_batches_are_rejected_after_init() {
    let h = harness(ScriptedPage::default());
    let err = h
        .executor
        .fill_plans(BatchPayload::new(Vec::new(), InputConfig::default()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "입력할 데이터가 없습니다");

    let err = h
        .executor
        .fill_evaluations(BatchPayload::new(Vec::new(), InputConfig::default()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "입력할 평가 데이터가 없습니다");
    // initialized once, then reused
    assert_eq!(h.page.actions(), vec!["ensureApp"]);
}

#[tokio::test]
async fn init_retries_then_gives_up_with_page_message() {
    let h = harness(ScriptedPage {
        ensure_app_failures: AtomicUsize::new(10),
        ..ScriptedPage::default()
    });
    let err = h
        .executor
        .fill_evaluations(BatchPayload::new(
            vec![EvalRecord::new(3, "x")],
            InputConfig::default(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::InitFailed(_)));
    assert_eq!(
        err.to_string(),
        "나이스 시스템 초기화 실패. 월별평가 페이지에서 실행 중인지 확인해주세요."
    );
    assert_eq!(h.page.count("ensureApp"), 3);
    assert_eq!(h.clock.total_slept(), Duration::from_secs(5));
    assert!(!h.executor.is_initialized());
}

#[tokio::test]
async fn init_recovers_on_a_later_attempt() {
    let h = harness(ScriptedPage {
        ensure_app_failures: AtomicUsize::new(2),
        ..ScriptedPage::default()
    });
    assert!(h.executor.initialize(&RetryPolicy::PAGE_LOAD).await);
    assert_eq!(h.page.count("ensureApp"), 3);
    assert!(h.executor.is_initialized());
}

#[tokio::test]
async fn named_student_is_selected_before_filling() {
    let h = harness(ScriptedPage::default());
    let payload = BatchPayload::new(vec![plan(3, "a")], InputConfig::default()).with_filters(
        StudentFilter {
            student_name: Some("김하늘".into()),
            student_number: Some("3".into()),
        },
    );
    h.executor.fill_plans(payload).await.unwrap();

    assert_eq!(h.page.actions()[1], "ensureStudent");
    let student = h.executor.current_student().unwrap();
    assert_eq!((student.index, student.name.as_str()), (4, "김하늘"));
    assert_eq!(h.executor.current_plans().len(), 1);
}

#[tokio::test]
async fn cancellation_stops_before_the_next_record_and_skips_save() {
    let page = ScriptedPage::default();
    let h = harness(page);
    let cancel = CancellationToken::new();
    let executor = h.executor.with_cancel(cancel.clone());
    assert!(executor.init().await);
    cancel.cancel();

    let result = executor
        .fill_plans(BatchPayload::new(vec![plan(3, "a"), plan(4, "b")], InputConfig::default()))
        .await
        .unwrap();
    assert!(result.cancelled);
    assert!(!result.success);
    assert!(result.results.is_empty());
    assert_eq!(h.page.count("save"), 0);
    assert_eq!(h.page.count("addRow"), 0);
}
