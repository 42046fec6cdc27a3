//! Host page selectors used for grid navigation.

pub const GRID: &str = r#"[role="grid"]"#;
pub const ROW: &str = r#"[role="row"]"#;
pub const GRID_CELL: &str = r#"[role="gridcell"]"#;
/// Month column cell; its label reads like `"3행 월 3"`.
pub const MONTH_CELL: &str = r#"[role="gridcell"][aria-label*="월 "]"#;
/// Ordinal (`순번`) column cell.
pub const ORDINAL_CELL: &str = r#"[role="gridcell"][aria-label*="순번"]"#;
pub const SELECTED_ROW: &str = r#"[role="row"][aria-selected="true"]"#;

/// Monthly evaluation grid and its data area.
pub const EVAL_GRID: &str = r#"[title="월별개별화교육평가 테이블"]"#;
pub const EVAL_DATA_AREA: &str = ".cl-grid-detail";
pub const EVAL_SELECTED_ROW: &str =
    r#"[role="row"].cl-selected, [role="row"][aria-selected="true"]"#;

pub const TEXTAREA: &str = "textarea";
pub const EVAL_PLAN_TEXTAREA: &str = r#"textarea[aria-label="평가계획"]"#;
