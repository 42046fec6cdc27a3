//! DOM access for the autofill workspace.
//!
//! [`DomPort`] is the element-level seam every higher crate works against.
//! [`cdp::CdpDom`] drives a live Chromium tab; [`memory::MemoryDom`] is an
//! in-process document used by tests and dry runs. [`FrameworkPort`] reaches
//! the host page's component framework for the component-API bridge.

pub mod cdp;
pub mod errors;
pub mod memory;
pub mod model;
pub mod port;

pub use errors::DomError;
pub use model::{
    ComponentRef, DomEvent, FrameDocument, KeyInput, MouseKind, NodeDescription, NodeId, Rect,
    ScrollBlock, ScrollMetrics,
};
pub use port::{DomPort, FrameworkPort};
