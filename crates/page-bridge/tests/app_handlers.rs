use std::sync::Arc;
use std::time::Duration;

use action_primitives::ManualClock;
use dom_adapter::memory::{MemoryComponent, MemoryFramework, MethodResult};
use dom_adapter::ComponentRef;
use nice_core_types::MonthValue;
use page_bridge::handlers::APP_ID;
use page_bridge::{
    AppHandlers, BridgeCommand, BridgeError, BridgeHandler, EnsureStudentPayload,
    SelectMonthPayload, SetFieldsPayload,
};
use serde_json::{json, Value};

struct Screen {
    fw: MemoryFramework,
    grid: ComponentRef,
    data_set: ComponentRef,
    student_grid: ComponentRef,
    combo: ComponentRef,
    month_input: ComponentRef,
    add_row: ComponentRef,
    text_areas: Vec<ComponentRef>,
}

fn students(fw: &MemoryFramework) -> Vec<ComponentRef> {
    [("김하늘", 3), ("이바다", 7)]
        .into_iter()
        .map(|(name, number)| {
            fw.add(MemoryComponent::new().method("getValue", move |_, args| {
                match args.first().and_then(Value::as_str) {
                    Some("stuFlnm") => MethodResult::Value(json!(format!(" {name} "))),
                    Some("clsNo") => MethodResult::Value(json!(number)),
                    _ => MethodResult::Value(Value::Null),
                }
            }))
        })
        .collect()
}

/// Monthly plan screen registered under the app id, school year `year`.
fn screen(year: &str) -> Screen {
    let fw = MemoryFramework::new();
    let platform = fw.add(MemoryComponent::new().returns("getActiveApplication", Value::Null));
    let app = fw.add(MemoryComponent::new());
    let grid = fw.add(MemoryComponent::new().returns("getSelectedRowIndex", json!(2)));
    let data_set = fw.add(
        MemoryComponent::new()
            .returns("getRowCount", json!(3))
            .returns("setValue", Value::Null),
    );
    let rows = students(&fw);
    let student_grid = fw.add(
        MemoryComponent::new()
            .returns("getRowCount", json!(rows.len()))
            .method("getRow", move |_, args| {
                let index = args.first().and_then(Value::as_u64).unwrap_or(0) as usize;
                MethodResult::Object(rows.get(index).copied())
            })
            .returns("selectRow", Value::Null),
    );
    let search = fw.add(MemoryComponent::new().returns("getValue", json!(year)));
    let combo = fw.add(
        MemoryComponent::new()
            .returns("open", Value::Null)
            .returns(
                "getItems",
                json!([
                    {"label": "3월", "value": "03"},
                    {"label": "9월", "value": "09"},
                    {"content": "10월"},
                ]),
            )
            .returns("selectItem", Value::Null),
    );
    let month_input = fw.add(MemoryComponent::new());
    let add_row = fw.add(MemoryComponent::new().returns("click", Value::Null));
    let save = fw.add(MemoryComponent::new().returns("click", Value::Null));

    for (name, component) in [
        ("grdListMnbyIduzEdu", grid),
        ("dsSearchMnbyIduzEduPlan", data_set),
        ("grdStuList", student_grid),
        ("dmSearch", search),
        ("cmbMnbyIduzEduPlanMmntValue", combo),
        ("ipbMnbyIduzEduPlanMmntValue", month_input),
        ("btnAddRow", add_row),
        ("btnSave", save),
    ] {
        fw.register(app, name, component);
    }
    let text_areas: Vec<ComponentRef> = [
        "txaMnbyIduzEduGoalCn",
        "txaMnbyIduzEduCn",
        "txaMnbyIduzEduMthCn",
        "txaEvlCriaCn",
    ]
    .into_iter()
    .map(|name| {
        let area = fw.add(MemoryComponent::new());
        fw.register(app, name, area);
        area
    })
    .collect();

    fw.install_platform(platform);
    fw.install_application(APP_ID, app);
    Screen {
        fw,
        grid,
        data_set,
        student_grid,
        combo,
        month_input,
        add_row,
        text_areas,
    }
}

fn handlers(fw: &MemoryFramework) -> (AppHandlers, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    (AppHandlers::new(Arc::new(fw.clone()), clock.clone()), clock)
}

fn method_names(fw: &MemoryFramework, target: ComponentRef) -> Vec<String> {
    fw.calls_to(target).into_iter().map(|(m, _)| m).collect()
}

#[tokio::test]
async fn ensure_app_reports_row_counts() {
    let s = screen("2025");
    let (h, _) = handlers(&s.fw);
    let status = h.ensure_app().await.unwrap();
    assert_eq!(
        status,
        json!({"gridReady": true, "dataSetRows": 3, "studentRows": 2})
    );
}

#[tokio::test]
async fn combo_item_is_selected_from_2024() {
    let s = screen("2025");
    let (h, _) = handlers(&s.fw);
    let payload = SelectMonthPayload {
        months: vec![MonthValue::from("9월"), MonthValue::from("10월")],
        ..SelectMonthPayload::default()
    };
    assert!(h.select_month(&payload).await.unwrap());

    let combo_calls = s.fw.calls_to(s.combo);
    assert_eq!(
        combo_calls.last(),
        Some(&("selectItem".to_string(), vec![json!("09")]))
    );
    // Grid selection is row 2.
    assert_eq!(
        s.fw.calls_to(s.data_set).last(),
        Some(&(
            "setValue".to_string(),
            vec![json!(2), json!("mnbyIduzEduMmntValue"), json!("9월")]
        ))
    );
}

#[tokio::test]
async fn unknown_combo_label_falls_back_to_joined_value() {
    let s = screen("2024");
    let (h, _) = handlers(&s.fw);
    let payload = SelectMonthPayload {
        months: vec![MonthValue::from("11"), MonthValue::from("12")],
        row_index: Some(0),
        ..SelectMonthPayload::default()
    };
    assert!(h.select_month(&payload).await.unwrap());
    assert_eq!(s.fw.property_of(s.combo, "value"), Some(json!("11, 12")));
    assert!(!method_names(&s.fw, s.combo).contains(&"selectItem".to_string()));
}

#[tokio::test]
async fn older_years_write_the_month_input() {
    let s = screen("2023");
    let (h, _) = handlers(&s.fw);
    let payload = SelectMonthPayload {
        month: Some(MonthValue::from("4")),
        ..SelectMonthPayload::default()
    };
    assert!(h.select_month(&payload).await.unwrap());
    assert_eq!(s.fw.property_of(s.month_input, "value"), Some(json!("4")));
    assert!(s.fw.calls_to(s.combo).is_empty());

    let empty = SelectMonthPayload::default();
    assert!(!h.select_month(&empty).await.unwrap());
}

#[tokio::test]
async fn set_fields_writes_areas_and_data_set_columns() {
    let s = screen("2025");
    let (h, _) = handlers(&s.fw);
    let payload = SetFieldsPayload {
        row_index: Some(1),
        goal: "목표".into(),
        content: "내용".into(),
        method: "방법".into(),
        evaluation: "평가".into(),
        config: None,
    };
    assert!(h.set_fields(&payload).await.unwrap());

    let values: Vec<Option<Value>> = s
        .text_areas
        .iter()
        .map(|area| s.fw.property_of(*area, "value"))
        .collect();
    assert_eq!(
        values,
        vec![
            Some(json!("목표")),
            Some(json!("내용")),
            Some(json!("방법")),
            Some(json!("평가"))
        ]
    );
    let columns: Vec<Value> = s
        .fw
        .calls_to(s.data_set)
        .into_iter()
        .filter(|(m, _)| m == "setValue")
        .map(|(_, args)| args[1].clone())
        .collect();
    assert_eq!(
        columns,
        vec![
            json!("mnbyIduzEduGoalCn"),
            json!("mnbyIduzEduCn"),
            json!("mnbyIduzEduMthCn"),
            json!("evlCriaCn")
        ]
    );
    // Explicit row index wins over the grid selection.
    assert!(!method_names(&s.fw, s.grid).contains(&"getSelectedRowIndex".to_string()));
}

#[tokio::test]
async fn buttons_are_clicked_through_the_component_api() {
    let s = screen("2025");
    let (h, clock) = handlers(&s.fw);
    assert!(h.add_row().await.unwrap());
    assert_eq!(method_names(&s.fw, s.add_row), vec!["click"]);
    assert_eq!(clock.sleeps().last(), Some(&Duration::from_millis(500)));
    assert!(h.save().await.unwrap());
    assert_eq!(clock.sleeps().last(), Some(&Duration::from_millis(1000)));
}

#[tokio::test]
async fn ensure_student_matches_trimmed_name_and_number() {
    let s = screen("2025");
    let (h, _) = handlers(&s.fw);

    let found = h
        .ensure_student(&EnsureStudentPayload {
            name: Some("이바다".into()),
            number: Some("7".into()),
        })
        .await
        .unwrap();
    let selected = found.selected.expect("student selected");
    assert_eq!((selected.index, selected.name.as_str(), selected.number.as_str()), (1, "이바다", "7"));
    assert_eq!(
        s.fw.calls_to(s.student_grid).last(),
        Some(&("selectRow".to_string(), vec![json!(1)]))
    );

    let missing = h
        .ensure_student(&EnsureStudentPayload {
            name: Some("김하늘".into()),
            number: Some("9".into()),
        })
        .await
        .unwrap();
    assert!(missing.selected.is_none());
}

#[tokio::test]
async fn platform_lookup_serves_as_the_app() {
    let fw = MemoryFramework::new();
    let platform = fw.add(MemoryComponent::new());
    let grid = fw.add(MemoryComponent::new());
    let data_set = fw.add(MemoryComponent::new().returns("getRowCount", json!(0)));
    fw.register(platform, "grdListMnbyIduzEdu", grid);
    fw.register(platform, "dsSearchMnbyIduzEduPlan", data_set);
    fw.install_platform(platform);
    let (h, _) = handlers(&fw);

    let status = h.ensure_app().await.unwrap();
    assert_eq!(status["dataSetRows"], 0);
    assert_eq!(status["studentRows"], Value::Null);
}

#[tokio::test]
async fn missing_platform_gives_up_after_thirty_seconds() {
    let fw = MemoryFramework::new();
    let (h, clock) = handlers(&fw);
    let err = h.ensure_app().await.unwrap_err();
    assert_eq!(err.to_string(), "CPR framework unavailable");
    assert_eq!(clock.total_slept(), Duration::from_secs(30));
}

#[tokio::test]
async fn missing_grid_is_an_initialization_error() {
    let fw = MemoryFramework::new();
    let platform = fw.add(MemoryComponent::new());
    let app = fw.add(MemoryComponent::new());
    fw.install_platform(platform);
    fw.install_application(APP_ID, app);
    let (h, _) = handlers(&fw);

    let err = h.handle(BridgeCommand::AddRow).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "필수 UI 컴포넌트를 찾을 수 없습니다 (grid 또는 dataSet이 없음)"
    );
}

#[tokio::test]
async fn dom_only_actions_are_unsupported() {
    let s = screen("2025");
    let (h, _) = handlers(&s.fw);
    let err = h.handle(BridgeCommand::DetectPageType).await.unwrap_err();
    assert!(matches!(err, BridgeError::Unsupported(_)));
    assert_eq!(err.to_string(), "Unsupported action: detectPageType");
}
