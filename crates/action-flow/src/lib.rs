//! Batch orchestration layer
//!
//! Runs a whole plan or evaluation batch against the page bridge: initializes
//! the bridge with a retry budget, sorts records into school-year order,
//! fills them one by one, reports progress on the status bus and saves once
//! at the end.

pub mod errors;
pub mod executor;
pub mod strategies;
pub mod types;

pub use errors::FlowError;
pub use executor::BatchExecutor;
pub use strategies::RetryPolicy;
pub use types::{BatchMode, BatchPayload, BatchResult, RecordOutcome, StudentFilter};
