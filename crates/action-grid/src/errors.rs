//! Error types for grid navigation

use action_primitives::ActionError;
use dom_adapter::DomError;
use thiserror::Error;

/// Grid navigation only errors on backend failures; a row that cannot be
/// found is reported as `Ok(false)`.
#[derive(Debug, Error, Clone)]
pub enum GridError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Action(#[from] ActionError),
}
