//! Client
//!
//! Action-based chat client state machine for the Obrol protocol. Manages
//! the connection lifecycle, frame classification, and the message log for
//! a single private-chat session.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`obrol_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`])
//! for the caller to execute.
//!
//! # Components
//!
//! - [`ChatClient`]: Top-level state machine for one chat session
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedTransport`]: Channel handle to a live WebSocket
//! - [`transport::connect`]: Dial a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod event;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::{ChatClient, ClientIdentity};
pub use event::{ClientAction, ClientEvent};
pub use obrol_core::{env::Environment, SessionState};
