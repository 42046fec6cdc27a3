use std::sync::Arc;
use std::time::Duration;

use action_primitives::{ActionPrimitives, ManualClock, Pacer};
use dom_adapter::memory::{ElementSpec, MemoryDom};
use nice_core_types::PageType;
use page_bridge::{
    BridgeClient, BridgeCommand, BridgeError, BridgeResponder, BridgeVariant, DomHandlers,
    PageTypeResult, Window,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn dom_handlers(dom: &MemoryDom) -> Arc<DomHandlers> {
    Arc::new(DomHandlers::new(ActionPrimitives::new(
        Arc::new(dom.clone()),
        Arc::new(ManualClock::new()),
        Arc::new(Pacer::seeded(3)),
    )))
}

fn start_page(window: &Window, dom: &MemoryDom) -> CancellationToken {
    let cancel = CancellationToken::new();
    BridgeResponder::new(window.clone(), BridgeVariant::Dom, dom_handlers(dom)).spawn(cancel.clone());
    cancel
}

#[tokio::test]
async fn detects_plan_page_through_the_bridge() {
    let dom = MemoryDom::new();
    dom.append_to_body(ElementSpec::new("div").attr("title", "행추가"));
    let window = Window::new();
    let _page = start_page(&window, &dom);
    let client = BridgeClient::new(window, BridgeVariant::Dom);

    let result: PageTypeResult = client.request(&BridgeCommand::DetectPageType).await.unwrap();
    assert_eq!(result.page_type, Some(PageType::Plan));
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn handler_errors_come_back_as_remote_messages() {
    let dom = MemoryDom::new();
    let window = Window::new();
    let _page = start_page(&window, &dom);
    let client = BridgeClient::new(window, BridgeVariant::Dom);

    let err = client.send(&BridgeCommand::Save).await.unwrap_err();
    assert!(matches!(err, BridgeError::Remote(_)));
    assert_eq!(err.to_string(), "저장 버튼을 찾을 수 없습니다");
}

#[tokio::test]
async fn unknown_action_is_answered_as_unsupported() {
    let dom = MemoryDom::new();
    let window = Window::new();
    let _page = start_page(&window, &dom);
    let mut rx = window.subscribe();

    window.post_message(json!({
        "type": "NICE_BRIDGE_DOM_REQUEST",
        "requestId": "req_1_1",
        "action": "deleteEverything",
        "payload": {},
    }));

    let response = loop {
        let message = rx.recv().await.unwrap();
        if message.data["type"] == "NICE_BRIDGE_DOM_RESPONSE" {
            break message.data;
        }
    };
    assert_eq!(response["requestId"], "req_1_1");
    assert_eq!(response["success"], false);
    assert_eq!(response["error"], "Unsupported action: deleteEverything");
}

#[tokio::test(start_paused = true)]
async fn foreign_sources_and_other_tags_are_ignored() {
    let dom = MemoryDom::new();
    dom.append_to_body(ElementSpec::new("div").attr("title", "저장"));
    let window = Window::new();
    let _page = start_page(&window, &dom);
    let mut rx = window.subscribe();

    let request = json!({
        "type": "NICE_BRIDGE_DOM_REQUEST",
        "requestId": "req_1_1",
        "action": "detectPageType",
    });
    window.frame().post_message(request.clone());
    let mut app_tagged = request.clone();
    app_tagged["type"] = Value::from("NICE_BRIDGE_REQUEST");
    window.post_message(app_tagged);

    let answered = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let message = rx.recv().await.unwrap();
            if message.data["type"] == "NICE_BRIDGE_DOM_RESPONSE" {
                return message.data;
            }
        }
    })
    .await;
    assert!(answered.is_err(), "no response expected");
}

#[tokio::test]
async fn request_ids_carry_time_and_counter() {
    let window = Window::new();
    let mut rx = window.subscribe();
    let client = BridgeClient::new(window, BridgeVariant::App)
        .with_timeout(Some(Duration::from_millis(10)));

    let _ = client.send(&BridgeCommand::AddRow).await;
    let _ = client.send(&BridgeCommand::Save).await;

    let mut ids = Vec::new();
    while let Ok(message) = rx.try_recv() {
        assert_eq!(message.data["type"], "NICE_BRIDGE_REQUEST");
        ids.push(message.data["requestId"].as_str().unwrap().to_string());
    }
    assert_eq!(ids.len(), 2);
    for (n, id) in ids.iter().enumerate() {
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "req");
        assert!(parts[1].parse::<i64>().unwrap() > 0);
        assert_eq!(parts[2], (n + 1).to_string());
    }
}

#[tokio::test(start_paused = true)]
async fn unanswered_request_stays_pending_without_timeout() {
    let window = Window::new();
    let client = BridgeClient::new(window, BridgeVariant::Dom);

    tokio::select! {
        _ = client.send(&BridgeCommand::Save) => panic!("nobody answers"),
        _ = tokio::time::sleep(Duration::from_secs(600)) => {}
    }
    assert_eq!(client.pending_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_rejects_and_evicts() {
    let window = Window::new();
    let client =
        BridgeClient::new(window, BridgeVariant::Dom).with_timeout(Some(Duration::from_secs(3)));

    let err = client.send(&BridgeCommand::Save).await.unwrap_err();
    match err {
        BridgeError::Timeout {
            action, timeout_ms, ..
        } => {
            assert_eq!(action, "save");
            assert_eq!(timeout_ms, 3000);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn cancelled_responder_stops_answering() {
    let dom = MemoryDom::new();
    let window = Window::new();
    let page = start_page(&window, &dom);
    page.cancel();
    tokio::task::yield_now().await;

    let client =
        BridgeClient::new(window, BridgeVariant::Dom).with_timeout(Some(Duration::from_millis(50)));
    let err = client.send(&BridgeCommand::DetectPageType).await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { .. }));
}

#[tokio::test]
async fn timeout_runs_on_the_injected_clock() {
    let window = Window::new();
    let clock = Arc::new(ManualClock::new());
    let client = BridgeClient::new(window, BridgeVariant::Dom)
        .with_timeout(Some(Duration::from_secs(30)))
        .with_clock(clock.clone());

    // nobody answers, and no real time passes before the rejection
    let err = client.send(&BridgeCommand::AddRow).await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { timeout_ms: 30_000, .. }));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(30)]);
    assert_eq!(client.pending_count(), 0);
}
