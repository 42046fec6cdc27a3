//! Grid navigation for the monthly plan and evaluation screens.
//!
//! The host grids are virtualized: only a window of rows exists in the DOM at
//! any time. [`GridNavigator`] finds rows by month or by ordinal, scrolling the
//! grid as needed, and remembers the last row it selected so the evaluation
//! text area can be found relative to it.

pub mod errors;
mod navigator;
pub mod selectors;

pub use errors::GridError;
pub use navigator::{GridNavigator, MAX_SCROLL_ATTEMPTS};
