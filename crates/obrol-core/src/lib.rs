//! Session core for the Obrol chat client.
//!
//! Action-based, sans-IO building blocks:
//!
//! - [`Session`]: connection lifecycle state machine (dial guard, linear
//!   backoff, terminal close codes, heartbeat, visibility suspension)
//! - [`MessageLog`]: append-only ordered record of chat messages
//! - [`Environment`]: time injection for deterministic tests
//!
//! State machines consume events and return actions for a driver to
//! execute. No socket, timer, or clock is touched directly, which is what
//! makes every timeout and backoff delay unit-testable.

#![forbid(unsafe_code)]

pub mod env;
mod error;
mod log;
mod session;

pub use error::ConfigError;
pub use log::{Direction, LogEntry, MessageLog};
pub use session::{
    Session, SessionAction, SessionConfig, SessionEvent, SessionState, DEFAULT_HEARTBEAT_INTERVAL,
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_STEP,
};
