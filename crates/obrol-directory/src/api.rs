//! Roster API seam.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Brief contact profile: a normalized projection of a backend user
/// record, as shown in the directory sidebar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Profile {
    /// Stable user id.
    pub id: String,
    /// Backend-assigned UUID.
    #[serde(default)]
    pub uuid: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Marketplace role of the contact.
    #[serde(default)]
    pub role: String,
    /// Avatar URL.
    #[serde(default)]
    pub profile_picture: String,
}

/// Roster API errors.
///
/// These never surface to the user; the directory degrades to an empty
/// list on any of them.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be made or completed.
    #[error("transport failure: {reason}")]
    Transport {
        /// Underlying failure description.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("http status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body was not a valid profile payload.
    #[error("undecodable response: {reason}")]
    Decode {
        /// Underlying failure description.
        reason: String,
    },
}

/// Backend lookups the directory needs.
///
/// Object-safe so the directory can hold `Arc<dyn RosterApi>` and tests
/// can substitute a scripted backend.
#[async_trait]
pub trait RosterApi: Send + Sync {
    /// The full worker roster.
    async fn roster(&self) -> Result<Vec<Profile>, ApiError>;

    /// One user's brief profile.
    async fn profile(&self, id: &str) -> Result<Profile, ApiError>;
}
