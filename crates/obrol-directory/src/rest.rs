//! REST roster backend.
//!
//! Thin [`RosterApi`] implementation over the marketplace HTTP API.
//! Errors map into [`ApiError`] and are left to the directory's
//! degrade-to-empty policy.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::api::{ApiError, Profile, RosterApi};

/// Roster backend over HTTP.
#[derive(Debug, Clone)]
pub struct RestRosterApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestRosterApi {
    /// Create a backend for the given API base URL and bearer token.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Transport { reason: e.to_string() })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::Status { status: status.as_u16() });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Decode { reason: e.to_string() })
    }
}

#[async_trait]
impl RosterApi for RestRosterApi {
    async fn roster(&self) -> Result<Vec<Profile>, ApiError> {
        self.get_json("/users/workers").await
    }

    async fn profile(&self, id: &str) -> Result<Profile, ApiError> {
        self.get_json(&format!("/users/{id}/brief")).await
    }
}
