//! NICE autofill library
//!
//! The extension-side pieces of the autofill tool: the content runtime that
//! answers runtime messages inside a tab, the background relay that forwards
//! status events, record parsing and the website client. The binary wires
//! them to a real browser over the DevTools protocol.

pub mod background;
pub mod config;
pub mod content;
pub mod errors;
pub mod records;
pub mod remote;
pub mod tab;

pub use background::{BackgroundRelay, RelayUpdate};
pub use config::AppConfig;
pub use content::{ContentRuntime, RuntimeMessage};
pub use errors::{RecordError, RemoteError, TabError};
pub use tab::{send_with_reinject, LocalTab, TabPort};
