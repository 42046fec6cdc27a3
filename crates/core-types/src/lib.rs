//! Shared domain primitives for the NICE autofill workspace.
//!
//! Everything here is plain data: month handling with academic-year ordering,
//! typing speed settings, the record shapes fed to the orchestrator and a few
//! identifiers shared between the content and page sides.

mod ids;
pub mod input;
pub mod month;
pub mod page;
pub mod records;

pub use ids::{TabId, WindowId};
pub use input::{InputConfig, InputConfigPatch, Speed, SpeedProfile};
pub use month::{academic_value, digits_only, sort_academic, Month, MonthValue};
pub use page::PageType;
pub use records::{sort_by_academic_month, EvalRecord, MonthKeyed, PlanRecord};

use thiserror::Error;

/// Error raised while interpreting user supplied domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid month: {0}")]
    InvalidMonth(String),
    #[error("unknown speed: {0}")]
    UnknownSpeed(String),
}
