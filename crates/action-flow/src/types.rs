//! Batch request and result shapes exchanged with the control surface.

use nice_core_types::{InputConfig, PageType, Speed};
use serde::{Deserialize, Serialize};

/// Which workflow a batch runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    Plans,
    Evaluations,
}

impl BatchMode {
    pub fn page(self) -> PageType {
        match self {
            BatchMode::Plans => PageType::Plan,
            BatchMode::Evaluations => PageType::Evaluation,
        }
    }
}

/// Student the batch belongs to, when the caller names one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_number: Option<String>,
}

impl StudentFilter {
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.student_name) && blank(&self.student_number)
    }
}

/// `data` of a `fillMonthlyPlans` / `fillMonthlyEvaluations` message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload<R> {
    #[serde(default)]
    pub plans: Vec<R>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<Speed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<StudentFilter>,
}

impl<R> BatchPayload<R> {
    pub fn new(plans: Vec<R>, config: InputConfig) -> Self {
        Self {
            plans,
            speed: Some(config.speed),
            human_mode: Some(config.human_mode),
            filters: None,
        }
    }

    pub fn with_filters(mut self, filters: StudentFilter) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Speed defaults to normal; human mode is on unless explicitly `false`.
    pub fn config(&self) -> InputConfig {
        InputConfig {
            speed: self.speed.unwrap_or_default(),
            human_mode: self.human_mode != Some(false),
        }
    }
}

/// Outcome of one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Result of a batch that got past initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    pub results: Vec<RecordOutcome>,
    pub success_count: usize,
    pub total_count: usize,
    /// Stopped early by cancellation; save was skipped.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl BatchResult {
    pub fn from_outcomes(results: Vec<RecordOutcome>, total_count: usize, cancelled: bool) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            success: !cancelled && success_count == total_count,
            results,
            success_count,
            total_count,
            cancelled,
        }
    }
}
