//! WebSocket close codes and the retry policy table.
//!
//! A small set of close codes is terminal: once the server closes with one
//! of these, automatic reconnection is deliberately disabled and recovery
//! requires an explicit manual reconnect.

/// Normal closure (RFC 6455 1000). Used for graceful shutdown.
pub const CLOSE_NORMAL: u16 = 1000;

/// Abnormal closure (1006): the connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Policy violation (1008).
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Server internal error (1011).
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Whether a close code disables automatic reconnection.
#[must_use]
pub fn is_terminal(code: u16) -> bool {
    matches!(code, CLOSE_ABNORMAL | CLOSE_POLICY_VIOLATION | CLOSE_INTERNAL_ERROR)
}
