//! Structural snapshot of the live document.
//!
//! Walks the DOM (and same-origin frames) through a [`DomPort`](dom_adapter::DomPort) and produces a
//! JSON tree of tags, ids, classes, interesting attributes, leaf text and
//! accessible labels. Used to debug selectors against a real NEIS screen.

mod errors;
mod labels;
pub mod model;
mod walker;

pub use errors::SnapshotError;
pub use model::{DomSnapshot, FrameInfo, SnapshotNode, SnapshotOptions};
pub use walker::capture;
