//! Record shapes consumed by the batch orchestrator.

use serde::{Deserialize, Serialize};

use crate::month::{academic_value, MonthValue};

/// One monthly education plan row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<MonthValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<MonthValue>,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub evaluation: String,
}

impl PlanRecord {
    pub fn for_month(month: impl Into<MonthValue>) -> Self {
        Self {
            month: Some(month.into()),
            ..Self::default()
        }
    }

    /// True when no text field carries content.
    pub fn is_empty(&self) -> bool {
        [&self.goal, &self.content, &self.method, &self.evaluation]
            .iter()
            .all(|field| field.trim().is_empty())
    }
}

/// One monthly evaluation row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<MonthValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<MonthValue>,
    #[serde(default)]
    pub eval_text: String,
}

impl EvalRecord {
    pub fn new(month: impl Into<MonthValue>, eval_text: impl Into<String>) -> Self {
        Self {
            month: Some(month.into()),
            months: Vec::new(),
            eval_text: eval_text.into(),
        }
    }
}

/// Records addressed by one or more months.
pub trait MonthKeyed {
    fn month(&self) -> Option<&MonthValue>;
    fn months(&self) -> &[MonthValue];

    /// `months` when present, otherwise the single `month`.
    fn month_list(&self) -> Vec<MonthValue> {
        if !self.months().is_empty() {
            return self.months().to_vec();
        }
        self.month().cloned().into_iter().collect()
    }

    /// Academic-year value of the first month; 0 when no month is given.
    fn first_month_value(&self) -> u32 {
        let first = self.months().first().or(self.month());
        match first {
            Some(value) => academic_value(value.sort_number()),
            None => 0,
        }
    }
}

impl MonthKeyed for PlanRecord {
    fn month(&self) -> Option<&MonthValue> {
        self.month.as_ref()
    }

    fn months(&self) -> &[MonthValue] {
        &self.months
    }
}

impl MonthKeyed for EvalRecord {
    fn month(&self) -> Option<&MonthValue> {
        self.month.as_ref()
    }

    fn months(&self) -> &[MonthValue] {
        &self.months
    }
}

/// Stable sort by the academic-year value of each record's first month.
pub fn sort_by_academic_month<R: MonthKeyed>(records: &mut [R]) {
    records.sort_by_key(|record| record.first_month_value());
}
