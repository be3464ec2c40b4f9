//! Core error types.

use thiserror::Error;

/// Session configuration errors.
///
/// Configuration errors are fatal for the session: the state machine moves
/// to `Error` and never schedules a retry, because redialing with the same
/// broken endpoint cannot succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No authentication token was provided.
    #[error("missing authentication token")]
    MissingToken,

    /// No endpoint URL was provided.
    #[error("missing endpoint URL")]
    MissingUrl,

    /// The endpoint URL does not parse as an absolute URL.
    #[error("invalid endpoint URL: {reason}")]
    InvalidUrl {
        /// Underlying parse failure, stringified.
        reason: String,
    },

    /// The endpoint URL uses a scheme other than `ws` or `wss`.
    #[error("unsupported endpoint scheme: {scheme}")]
    UnsupportedScheme {
        /// The offending scheme.
        scheme: String,
    },
}
