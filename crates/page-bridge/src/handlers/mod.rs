//! Page-side handler sets.

mod app;
mod dom;

pub use app::{AppHandlers, APP_ID};
pub use dom::{selectors, DomHandlers};
