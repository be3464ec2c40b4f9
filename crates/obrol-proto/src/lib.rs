//! Wire protocol for the Obrol chat client.
//!
//! Every frame exchanged over the WebSocket is one JSON document. Inbound
//! frames are classified into a tagged union keyed on the `type`
//! discriminator ([`InboundFrame`]); anything without a recognized system
//! tag is a user message. Outbound frames ([`OutboundFrame`]) are the user
//! message and the keep-alive ping.
//!
//! This crate has no I/O: it only defines the frame types, their JSON
//! codec, and the close-code policy table.

#![forbid(unsafe_code)]

mod close;
mod error;
mod frame;

pub use close::{is_terminal, CLOSE_ABNORMAL, CLOSE_INTERNAL_ERROR, CLOSE_NORMAL, CLOSE_POLICY_VIOLATION};
pub use error::ProtocolError;
pub use frame::{InboundFrame, OutboundFrame};
