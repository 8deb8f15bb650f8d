//! REST room directory and history store.
//!
//! Thin reqwest layer over the platform's chat endpoints: resolution is a
//! POST that creates the room when missing, history is a GET returning
//! messages oldest first. One [`HttpApi`] value implements both service
//! traits.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use roomwire_proto::{ConversationKey, Message, Room, RoomId};
use thiserror::Error;

use crate::services::{DirectoryError, HistoryError, HistoryStore, RoomDirectory};

/// Default end-to-end timeout for one REST request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to reach the REST API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://campus.example.edu`.
    pub base_url: String,
    /// Bearer token attached to every request.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ApiConfig {
    /// Config for `base_url` with the default timeout and no auth.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), token: None, timeout: DEFAULT_TIMEOUT }
    }

    /// Attach a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// The HTTP client could not be constructed.
#[derive(Debug, Error)]
#[error("http client setup failed: {0}")]
pub struct HttpSetupError(String);

/// REST implementation of [`RoomDirectory`] and [`HistoryStore`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    config: ApiConfig,
}

impl HttpApi {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// [`HttpSetupError`] if the underlying TLS backend cannot be
    /// initialized.
    pub fn new(config: ApiConfig) -> Result<Self, HttpSetupError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HttpSetupError(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn rooms_url(&self) -> String {
        format!("{}/api/chat/rooms", self.config.base_url.trim_end_matches('/'))
    }

    fn history_url(&self, room: &RoomId) -> String {
        format!("{}/api/chat/rooms/{room}/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RoomDirectory for HttpApi {
    async fn resolve(&self, key: &ConversationKey) -> Result<Room, DirectoryError> {
        let response = self
            .with_auth(self.client.post(self.rooms_url()).json(key))
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }
        response.json().await.map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl HistoryStore for HttpApi {
    async fn list_messages(&self, room: &RoomId) -> Result<Vec<Message>, HistoryError> {
        let response = self
            .with_auth(self.client.get(self.history_url(room)))
            .send()
            .await
            .map_err(|e| HistoryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Status(status.as_u16()));
        }
        response.json().await.map_err(|e| HistoryError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_shaped_from_base() {
        let api = HttpApi::new(ApiConfig::new("https://campus.example.edu/")).expect("client");

        assert_eq!(api.rooms_url(), "https://campus.example.edu/api/chat/rooms");
        assert_eq!(
            api.history_url(&RoomId::new("42")),
            "https://campus.example.edu/api/chat/rooms/42/messages"
        );
    }

    #[test]
    fn token_is_optional() {
        let config = ApiConfig::new("http://localhost:8080").with_token("t0ken");
        assert_eq!(config.token.as_deref(), Some("t0ken"));
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
