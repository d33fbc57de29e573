//! HttpChatBackend -- concrete [`ChatBackend`] over the generation service's
//! HTTP API.
//!
//! `open_stream` posts to the streaming endpoint and hands back the raw
//! response body; decoding the `data:` lines is left to
//! [`sme_core::stream::EventStream`]. The bearer token is only exposed
//! when building the `Authorization` header.
//!
//! A 404 means "conversation not found" only on the conversation routes;
//! everywhere else it stays a plain status error.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use sme_core::backend::{ByteStream, ChatBackend};
use sme_types::api::{
    ChatRequest, ConversationDetail, ConversationListResponse, ConversationSummary, HealthStatus,
};
use sme_types::config::ClientConfig;
use sme_types::error::ChatError;

/// Generation service client.
///
/// Intentionally does NOT derive Debug; it never holds the token, but
/// request builders briefly do.
pub struct HttpChatBackend {
    client: reqwest::Client,
    base_url: String,
    stream_path: String,
    conversations_path: String,
    health_path: String,
}

impl HttpChatBackend {
    /// Build a backend from the client configuration.
    ///
    /// Fails only if the HTTP client cannot be constructed (e.g. the TLS
    /// backend fails to initialize).
    pub fn new(config: &ClientConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ChatError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            stream_path: config.stream_path.clone(),
            conversations_path: config.conversations_path.clone(),
            health_path: config.health_path.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full API URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of one conversation, with the id percent-encoded as a path segment.
    fn conversation_url(&self, conversation_id: &str) -> Result<Url, ChatError> {
        let mut url = Url::parse(&self.url(&self.conversations_path))
            .map_err(|e| ChatError::Config(format!("invalid API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ChatError::Config(format!("API URL cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(conversation_id);
        Ok(url)
    }

    /// `<health_path>/` or `<health_path>/detailed`.
    fn health_url(&self, detailed: bool) -> Result<Url, ChatError> {
        let mut url = Url::parse(&self.url(&self.health_path))
            .map_err(|e| ChatError::Config(format!("invalid API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ChatError::Config(format!("API URL cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(if detailed { "detailed" } else { "" });
        Ok(url)
    }

    fn authorized(
        builder: reqwest::RequestBuilder,
        token: Option<&SecretString>,
    ) -> reqwest::RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ChatError> {
        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, "generation service returned an error status");
            return Err(ChatError::from_status(status.as_u16(), error_detail(&body)));
        }
        Ok(response)
    }

    async fn json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ChatError> {
        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| ChatError::Decode(format!("unexpected response body: {e}")))
    }
}

impl ChatBackend for HttpChatBackend {
    async fn open_stream(
        &self,
        request: &ChatRequest,
        token: &SecretString,
    ) -> Result<ByteStream, ChatError> {
        let url = self.url(&self.stream_path);
        tracing::debug!(url = %url, "opening answer stream");

        let builder = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request);
        let response = Self::send(Self::authorized(builder, Some(token))).await?;

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatError::Transport(format!("stream read failed: {e}"))));
        Ok(Box::pin(bytes))
    }

    async fn list_conversations(
        &self,
        token: Option<&SecretString>,
    ) -> Result<Vec<ConversationSummary>, ChatError> {
        let builder = self.client.get(self.url(&self.conversations_path));
        let response = Self::send(Self::authorized(builder, token)).await?;
        let list: ConversationListResponse = Self::json(response).await?;
        Ok(list.into_summaries())
    }

    async fn fetch_conversation(
        &self,
        conversation_id: &str,
        token: Option<&SecretString>,
    ) -> Result<ConversationDetail, ChatError> {
        let builder = self.client.get(self.conversation_url(conversation_id)?);
        let response = Self::send(Self::authorized(builder, token))
            .await
            .map_err(ChatError::conversation_lookup)?;
        Self::json(response).await
    }

    async fn delete_conversation(
        &self,
        conversation_id: &str,
        token: Option<&SecretString>,
    ) -> Result<(), ChatError> {
        let builder = self.client.delete(self.conversation_url(conversation_id)?);
        Self::send(Self::authorized(builder, token))
            .await
            .map_err(ChatError::conversation_lookup)?;
        Ok(())
    }

    async fn health(&self, detailed: bool) -> Result<HealthStatus, ChatError> {
        let url = self.health_url(detailed)?;
        tracing::debug!(url = %url, "checking service health");
        let response = Self::send(self.client.get(url)).await?;
        Self::json(response).await
    }
}

fn transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Transport("request timed out".to_string())
    } else if e.is_connect() {
        ChatError::Transport(format!("could not connect to the generation service: {e}"))
    } else {
        ChatError::Transport(format!("HTTP request failed: {e}"))
    }
}

/// Pull a readable message out of an error body (`{"detail": ...}` is what
/// the service sends), falling back to the raw text.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail").or_else(|| map.get("message")) {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.trim().to_string(),
        },
        _ => body.trim().to_string(),
    }
}
