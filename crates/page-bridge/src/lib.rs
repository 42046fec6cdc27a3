//! Window-message bridge between the content side and the page.
//!
//! The content side owns a [`BridgeClient`] that posts correlated requests on
//! a [`Window`]; the page side runs a [`BridgeResponder`] that parses each
//! request into a [`BridgeCommand`] and hands it to a [`BridgeHandler`].
//! Two handler sets exist: [`DomHandlers`] works on the document only,
//! [`AppHandlers`] drives the host framework's component API.

pub mod command;
pub mod errors;
pub mod handlers;
pub mod protocol;

mod client;
mod responder;
mod window;

pub use client::BridgeClient;
pub use command::{
    BridgeCommand, EnsureStudentPayload, PageTypeResult, SelectMonthPayload,
    SelectRowByIndexPayload, SelectRowByMonthPayload, SelectedStudent, SetEvalTextPayload,
    SetFieldsPayload, StudentSelection,
};
pub use errors::BridgeError;
pub use handlers::{AppHandlers, DomHandlers};
pub use protocol::{BridgeRequest, BridgeResponse, BridgeVariant};
pub use responder::{BridgeHandler, BridgeResponder};
pub use window::{Window, WindowMessage};
