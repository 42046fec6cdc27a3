use dom_adapter::memory::{ElementSpec, MemoryDom};
use dom_snapshot::{capture, SnapshotError, SnapshotOptions};
use serde_json::json;

fn plan_form() -> MemoryDom {
    let dom = MemoryDom::with_location("https://dge.neis.go.kr/edu/plan");
    dom.append_to_body(
        ElementSpec::new("div")
            .id("form")
            .class("cl-form")
            .attr("role", "grid")
            .attr("data-row", "3")
            .attr("style", "width: 10px")
            .children([
                ElementSpec::new("span").id("goal-label").text(" 교육목표 "),
                ElementSpec::new("textarea")
                    .attr("aria-labelledby", "missing goal-label")
                    .attr("title", "교육목표"),
                ElementSpec::new("label").attr("for", "method").text("교육방법"),
                ElementSpec::new("input").id("method"),
                ElementSpec::new("label").child(
                    ElementSpec::new("div").child(ElementSpec::new("input").attr("type", "checkbox")),
                ).text("평가"),
                ElementSpec::new("div").attr("style", "display: none").text("숨김"),
            ]),
    );
    dom
}

#[tokio::test]
async fn captures_tags_attributes_text_and_labels() {
    let dom = plan_form();
    let snapshot = capture(&dom, SnapshotOptions::default()).await.unwrap();

    assert_eq!(snapshot.url, "https://dge.neis.go.kr/edu/plan");
    assert_eq!(snapshot.root_tag.as_deref(), Some("body"));
    assert!(!snapshot.exceeded_limit);
    assert!(snapshot.captured_at.ends_with('Z'));

    let body = snapshot.tree.unwrap();
    let form = &body.children[0];
    assert_eq!(form.id.as_deref(), Some("form"));
    assert_eq!(form.classes, vec!["cl-form"]);
    // style is not an interesting attribute
    assert_eq!(
        serde_json::to_value(&form.attributes).unwrap(),
        json!({"data-row": "3", "role": "grid"})
    );

    let labels: Vec<Option<&str>> = form.children.iter().map(|c| c.label.as_deref()).collect();
    assert_eq!(
        labels,
        vec![None, Some("교육목표"), None, Some("교육방법"), None, None]
    );
    assert_eq!(form.children[0].text.as_deref(), Some("교육목표"));
    let checkbox = &form.children[4].children[0].children[0];
    assert_eq!(checkbox.label.as_deref(), Some("평가"));
    assert_eq!(snapshot.total_nodes, 10);
}

#[tokio::test]
async fn hidden_elements_can_be_skipped() {
    let dom = plan_form();
    let options = SnapshotOptions {
        include_hidden: false,
        ..SnapshotOptions::default()
    };
    let snapshot = capture(&dom, options).await.unwrap();
    let form = &snapshot.tree.unwrap().children[0];
    assert_eq!(form.children.len(), 5);
    assert_eq!(snapshot.total_nodes, 9);
}

#[tokio::test]
async fn depth_and_node_limits() {
    let dom = plan_form();
    let shallow = capture(
        &dom,
        SnapshotOptions {
            max_depth: 1,
            ..SnapshotOptions::default()
        },
    )
    .await
    .unwrap();
    let form = &shallow.tree.unwrap().children[0];
    assert!(form.children.is_empty());
    assert!(!shallow.exceeded_limit);

    let capped = capture(
        &dom,
        SnapshotOptions {
            max_nodes: 3,
            ..SnapshotOptions::default()
        },
    )
    .await
    .unwrap();
    assert!(capped.exceeded_limit);
    assert_eq!(capped.total_nodes, 3);
}

#[tokio::test]
async fn root_selector_must_match() {
    let dom = plan_form();
    let snapshot = capture(
        &dom,
        SnapshotOptions {
            root_selector: Some("[role=\"grid\"]".into()),
            ..SnapshotOptions::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(snapshot.root_tag.as_deref(), Some("div"));

    let err = capture(
        &dom,
        SnapshotOptions {
            root_selector: Some("#nowhere".into()),
            ..SnapshotOptions::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SnapshotError::RootNotFound(_)));
    assert_eq!(err.to_string(), "선택자(#nowhere)에 해당하는 요소를 찾을 수 없습니다");
}

#[tokio::test]
async fn frames_are_walked_or_reported() {
    let dom = MemoryDom::new();
    let open = dom.append_to_body(ElementSpec::new("iframe"));
    let blocked = dom.append_to_body(ElementSpec::new("iframe"));
    dom.attach_frame(
        open,
        "https://dge.neis.go.kr/frame",
        ElementSpec::new("html").child(
            ElementSpec::new("body").children([
                ElementSpec::new("label").attr("for", "inner").text("내부"),
                ElementSpec::new("input").id("inner"),
            ]),
        ),
    );
    dom.block_frame(blocked, "https://other.example/");

    let snapshot = capture(&dom, SnapshotOptions::default()).await.unwrap();
    let body = snapshot.tree.unwrap();

    let frame = body.children[0].frame.as_ref().unwrap();
    assert_eq!(frame.url.as_deref(), Some("https://dge.neis.go.kr/frame"));
    let tree = frame.tree.as_ref().unwrap();
    assert_eq!(tree.tag, "body");
    assert_eq!(tree.children[1].label.as_deref(), Some("내부"));

    let frame = body.children[1].frame.as_ref().unwrap();
    assert_eq!(frame.error.as_deref(), Some("프레임 문서에 접근할 수 없습니다"));
    assert!(frame.tree.is_none());
}
