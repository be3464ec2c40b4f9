//! Terminal UI for Obrol
//!
//! A thin shell over the Sans-IO [`obrol_client::ChatClient`]: terminal
//! rendering, keyboard handling, and the async event loop that drives the
//! client machine, the contact directory, and the WebSocket transport.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod app;
pub mod runtime;
pub mod ui;

pub use app::{App, AppAction, AppEvent, Focus};
pub use runtime::{Runtime, RuntimeConfig, RuntimeError};
