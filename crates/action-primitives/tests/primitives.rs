use std::sync::Arc;
use std::time::Duration;

use action_primitives::{ActionPrimitives, ManualClock, Pacer, TokioClock, DEFAULT_TIMEOUT};
use dom_adapter::memory::{ElementSpec, Interaction, MemoryDom};
use dom_adapter::{DomEvent, DomPort};
use nice_core_types::{InputConfig, Speed};
use tokio_util::sync::CancellationToken;

fn primitives(dom: &MemoryDom, clock: Arc<ManualClock>) -> ActionPrimitives {
    ActionPrimitives::new(Arc::new(dom.clone()), clock, Arc::new(Pacer::seeded(42)))
}

#[tokio::test]
async fn present_element_is_returned_without_sleeping() {
    let dom = MemoryDom::new();
    let save = dom.append_to_body(ElementSpec::new("div").attr("title", "저장"));
    let clock = Arc::new(ManualClock::new());
    let actions = primitives(&dom, clock.clone());

    let found = actions
        .wait_for(r#"[title="저장"]"#, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(found, Some(save));
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn missing_element_times_out_with_none() {
    let dom = MemoryDom::new();
    let clock = Arc::new(ManualClock::new());
    let actions = primitives(&dom, clock.clone());

    let found = actions
        .wait_for(r#"[title="행추가"]"#, Duration::from_millis(2000))
        .await
        .unwrap();
    assert_eq!(found, None);
    assert_eq!(clock.total_slept(), Duration::from_millis(2000));
    assert!(clock.sleeps().iter().all(|d| *d == Duration::from_millis(100)));
}

#[tokio::test(start_paused = true)]
async fn element_appearing_later_is_found() {
    let dom = MemoryDom::new();
    let actions = ActionPrimitives::new(
        Arc::new(dom.clone()),
        Arc::new(TokioClock::new()),
        Arc::new(Pacer::seeded(1)),
    );
    let late = dom.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        late.append_to_body(ElementSpec::new("div").attr("title", "행추가"));
    });

    let found = actions
        .wait_for(r#"[title="행추가"]"#, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn cancelled_lookup_returns_none() {
    let dom = MemoryDom::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let actions = primitives(&dom, Arc::new(ManualClock::new())).with_cancel(cancel);
    let found = actions.wait_for("textarea", DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn direct_mode_sets_value_in_one_step() {
    let dom = MemoryDom::new();
    let area = dom.append_to_body(ElementSpec::new("textarea").value("old"));
    let actions = primitives(&dom, Arc::new(ManualClock::new()));
    let config = InputConfig {
        speed: Speed::Fast,
        human_mode: false,
    };

    actions.set_value(area, "새 목표", &config).await.unwrap();

    assert_eq!(dom.value_of(area), "새 목표");
    assert_eq!(
        dom.names_for(area),
        vec!["click", "focus", "value", "input", "value", "input", "keydown", "keyup", "change"]
    );
    assert_eq!(dom.active_element().await.unwrap(), Some(area));
}

#[tokio::test]
async fn human_mode_types_in_chunks_with_key_events() {
    let dom = MemoryDom::new();
    let area = dom.append_to_body(ElementSpec::new("textarea"));
    let clock = Arc::new(ManualClock::new());
    let actions = primitives(&dom, clock.clone());
    let config = InputConfig {
        speed: Speed::Normal,
        human_mode: true,
    };

    actions.set_value(area, "abcdefg", &config).await.unwrap();

    let values: Vec<String> = dom
        .log()
        .into_iter()
        .filter_map(|r| match r.interaction {
            Interaction::SetValue(v) => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec!["", "abc", "abcdef", "abcdefg"]);

    let keydowns = dom
        .log()
        .into_iter()
        .filter(|r| matches!(r.interaction, Interaction::Event(DomEvent::KeyDown(_))))
        .count();
    assert_eq!(keydowns, 7 + 1);
    assert_eq!(dom.names_for(area).last(), Some(&"change"));
    // click pause + clear pause + one pause per chunk
    assert_eq!(clock.sleeps().len(), 2 + 3);
}
