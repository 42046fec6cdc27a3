use std::fmt;

use serde::{Deserialize, Serialize};

/// Which NEIS screen the tab is showing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// 월별계획: has an add-row button.
    Plan,
    /// 월별평가: has a save button but no add-row button.
    Evaluation,
}

impl PageType {
    pub fn label(self) -> &'static str {
        match self {
            PageType::Plan => "월별계획",
            PageType::Evaluation => "월별평가",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageType::Plan => f.write_str("plan"),
            PageType::Evaluation => f.write_str("evaluation"),
        }
    }
}
