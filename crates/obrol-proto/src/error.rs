//! Protocol error types.

use thiserror::Error;

/// Errors produced while decoding inbound frames.
///
/// Decode errors are non-fatal by policy: the session drops the offending
/// frame and carries on. The error type exists so the caller can log the
/// drop, not so it can propagate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text is not a JSON object.
    #[error("frame is not a JSON object: {reason}")]
    Decode {
        /// Underlying parse failure, stringified.
        reason: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode { reason: err.to_string() }
    }
}
