use std::sync::Arc;
use std::time::Duration;

use action_primitives::{ActionPrimitives, ManualClock, Pacer};
use dom_adapter::memory::{ElementSpec, Interaction, MemoryDom};
use dom_adapter::{DomEvent, NodeId};
use nice_core_types::{InputConfigPatch, MonthValue, PageType, Speed};
use page_bridge::handlers::selectors;
use page_bridge::{
    BridgeCommand, BridgeHandler, DomHandlers, SelectMonthPayload, SetEvalTextPayload,
    SetFieldsPayload,
};
use serde_json::json;

fn handlers(dom: &MemoryDom) -> (DomHandlers, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let actions = ActionPrimitives::new(
        Arc::new(dom.clone()),
        clock.clone(),
        Arc::new(Pacer::seeded(11)),
    );
    (DomHandlers::new(actions), clock)
}

fn direct() -> Option<InputConfigPatch> {
    Some(InputConfigPatch {
        speed: Some(Speed::Fast),
        human_mode: Some(false),
    })
}

#[tokio::test]
async fn ensure_app_reports_the_page_kind() {
    let dom = MemoryDom::new();
    let (h, _) = handlers(&dom);
    let err = h.ensure_app().await.unwrap_err();
    assert_eq!(err.to_string(), "월별계획/평가 페이지를 찾을 수 없습니다");

    dom.append_to_body(ElementSpec::new("div").attr("title", "저장"));
    let ready = h.ensure_app().await.unwrap();
    assert_eq!(ready["ready"], true);
    assert_eq!(ready["pageType"], "evaluation");

    dom.append_to_body(ElementSpec::new("div").attr("title", "행추가"));
    let ready = h.ensure_app().await.unwrap();
    assert_eq!(ready["pageType"], "plan");
}

#[tokio::test]
async fn detect_page_type_does_not_wait() {
    let dom = MemoryDom::new();
    let (h, clock) = handlers(&dom);
    assert_eq!(h.detect_page_type().await.unwrap().page_type, None);
    assert!(clock.sleeps().is_empty());

    dom.append_to_body(ElementSpec::new("div").attr("title", "저장"));
    assert_eq!(
        h.detect_page_type().await.unwrap().page_type,
        Some(PageType::Evaluation)
    );
}

#[tokio::test]
async fn add_row_and_save_click_their_buttons() {
    let dom = MemoryDom::new();
    let (h, clock) = handlers(&dom);
    let err = h.add_row().await.unwrap_err();
    assert_eq!(err.to_string(), "행추가 버튼을 찾을 수 없습니다");

    let add = dom.append_to_body(ElementSpec::new("div").attr("title", "행추가"));
    let save = dom.append_to_body(ElementSpec::new("div").attr("title", "저장"));
    let before = clock.total_slept();
    assert!(h.add_row().await.unwrap());
    assert_eq!(clock.total_slept() - before, Duration::from_millis(400));
    assert!(h.save().await.unwrap());
    assert_eq!(dom.names_for(add), vec!["click"]);
    assert_eq!(dom.names_for(save), vec!["click"]);
    assert_eq!(clock.sleeps().last(), Some(&Duration::from_millis(800)));
}

/// Month combobox that opens its list on click and closes it on Escape.
fn month_combobox(dom: &MemoryDom) -> NodeId {
    let combobox = dom.append_to_body(
        ElementSpec::new("div")
            .attr("role", "combobox")
            .attr("title", "월"),
    );
    dom.set_reactor(move |dom, recorded| {
        if recorded.node != combobox {
            return;
        }
        match &recorded.interaction {
            Interaction::NativeClick => {
                dom.append_to_body(
                    ElementSpec::new("div")
                        .class("cl-combobox-list")
                        .attr("role", "listbox"),
                );
            }
            Interaction::Event(DomEvent::KeyDown(key)) if key.key == "Escape" => {
                if let Some(list) = dom.find(selectors::MONTH_LISTBOX).unwrap() {
                    dom.remove(list);
                }
            }
            _ => {}
        }
    });
    combobox
}

fn keys_sent(dom: &MemoryDom, node: NodeId) -> Vec<String> {
    dom.log()
        .into_iter()
        .filter(|r| r.node == node)
        .filter_map(|r| match r.interaction {
            Interaction::Event(DomEvent::KeyDown(key)) => Some(key.key),
            _ => None,
        })
        .collect()
}

fn months(values: &[&str]) -> SelectMonthPayload {
    SelectMonthPayload {
        months: values.iter().map(|m| MonthValue::from(*m)).collect(),
        ..SelectMonthPayload::default()
    }
}

#[tokio::test]
async fn select_month_walks_the_list_in_school_order() {
    let dom = MemoryDom::new();
    let combobox = month_combobox(&dom);
    let (h, _) = handlers(&dom);

    assert!(h.select_month(&months(&["9월", "3"])).await.unwrap());

    let mut expected = vec!["Home", "Enter"];
    expected.extend(std::iter::repeat("ArrowDown").take(6));
    expected.extend(["Enter", "Escape"]);
    assert_eq!(keys_sent(&dom, combobox), expected);
    assert!(dom.find(selectors::MONTH_LISTBOX).unwrap().is_none());
    assert_eq!(&dom.names_for(combobox)[..2], &["focus", "click"]);
}

#[tokio::test]
async fn january_sorts_after_december() {
    let dom = MemoryDom::new();
    let combobox = month_combobox(&dom);
    let (h, _) = handlers(&dom);

    assert!(h.select_month(&months(&["1", "12"])).await.unwrap());

    let keys = keys_sent(&dom, combobox);
    let downs = keys.iter().filter(|k| *k == "ArrowDown").count();
    assert_eq!(downs, 10);
    assert_eq!(keys.iter().filter(|k| *k == "Enter").count(), 2);
    assert_eq!(keys.last().map(String::as_str), Some("Escape"));
}

#[tokio::test]
async fn open_listbox_is_reused_and_moving_up_works() {
    let dom = MemoryDom::new();
    let combobox = month_combobox(&dom);
    dom.append_to_body(
        ElementSpec::new("div")
            .class("cl-combobox-list")
            .attr("role", "listbox"),
    );
    let (h, _) = handlers(&dom);

    let payload = SelectMonthPayload {
        month: Some(MonthValue::from("5")),
        ..SelectMonthPayload::default()
    };
    assert!(h.select_month(&payload).await.unwrap());
    assert!(!dom.names_for(combobox).contains(&"click"));
    assert_eq!(
        keys_sent(&dom, combobox),
        vec!["Home", "ArrowDown", "ArrowDown", "Enter", "Escape"]
    );
}

#[tokio::test]
async fn select_month_without_months_or_combobox_is_false() {
    let dom = MemoryDom::new();
    let (h, _) = handlers(&dom);
    assert!(!h.select_month(&months(&[])).await.unwrap());
    assert!(!h.select_month(&months(&["월"])).await.unwrap());
    assert!(!h.select_month(&months(&["4"])).await.unwrap());
}

fn plan_form(dom: &MemoryDom, titles: &[&str]) -> Vec<NodeId> {
    titles
        .iter()
        .map(|title| {
            let wrapper = dom.append_to_body(ElementSpec::new("div").attr("title", title));
            dom.append(wrapper, ElementSpec::new("textarea"))
        })
        .collect()
}

#[tokio::test]
async fn set_fields_fills_present_fields_and_skips_missing_ones() {
    let dom = MemoryDom::new();
    let areas = plan_form(&dom, &["교육목표", "교육방법", "평가계획"]);
    let (h, _) = handlers(&dom);

    let payload = SetFieldsPayload {
        goal: "목표".into(),
        content: "내용".into(),
        method: String::new(),
        evaluation: "평가".into(),
        config: direct(),
        ..SetFieldsPayload::default()
    };
    assert!(h.set_fields(&payload).await.unwrap());

    assert_eq!(dom.value_of(areas[0]), "목표");
    assert_eq!(dom.value_of(areas[1]), "");
    assert_eq!(dom.value_of(areas[2]), "평가");
    assert_eq!(dom.names_for(areas[2]).last(), Some(&"blur"));
    assert!(!dom.names_for(areas[0]).contains(&"blur"));
    assert_eq!(dom.names_for(dom.body_id()), vec!["click"]);
    assert_eq!(h.config().speed, Speed::Fast);
    assert!(!h.config().human_mode);
}

#[tokio::test]
async fn set_eval_text_uses_the_selected_row() {
    let dom = MemoryDom::new();
    dom.append_to_body(ElementSpec::new("textarea"));
    dom.append_to_body(
        ElementSpec::new("div")
            .attr("role", "row")
            .attr("aria-selected", "true")
            .children([ElementSpec::new("textarea"), ElementSpec::new("textarea")]),
    );
    let (h, _) = handlers(&dom);

    let payload = SetEvalTextPayload {
        eval_text: "목표를 달성함".into(),
        config: direct(),
    };
    assert!(h.set_eval_text(&payload).await.unwrap());

    let target = dom.find_all(r#"[aria-selected="true"] textarea"#).unwrap()[1];
    assert_eq!(dom.value_of(target), "목표를 달성함");
    assert_eq!(dom.names_for(target).last(), Some(&"blur"));
}

#[tokio::test]
async fn set_eval_text_without_any_field_fails() {
    let dom = MemoryDom::new();
    dom.append_to_body(ElementSpec::new("textarea").value("이미 입력됨"));
    let (h, _) = handlers(&dom);
    let err = h
        .set_eval_text(&SetEvalTextPayload {
            eval_text: "x".into(),
            config: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "평가 필드를 찾을 수 없습니다");
}

#[tokio::test]
async fn dispatch_covers_row_selection_and_students() {
    let dom = MemoryDom::new();
    let (h, _) = handlers(&dom);

    let by_index = BridgeCommand::parse("selectRowByIndex", json!({"index": -1, "isFirst": true})).unwrap();
    assert_eq!(h.handle(by_index).await.unwrap(), json!(false));

    let missing_index = BridgeCommand::parse("selectRowByIndex", json!({})).unwrap();
    assert_eq!(h.handle(missing_index).await.unwrap(), json!(false));

    let by_month = BridgeCommand::parse("selectRowByMonth", json!({"months": []})).unwrap();
    assert_eq!(h.handle(by_month).await.unwrap(), json!(false));

    let student = BridgeCommand::parse("ensureStudent", json!({"name": "김철수"})).unwrap();
    assert_eq!(h.handle(student).await.unwrap(), json!({"selected": null}));
}
