//! ChatBackend trait definition.
//!
//! The port through which the session controller reaches the remote
//! generation service: one streaming call, the non-streaming
//! conversation listing/fetch/delete calls, and a health check.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use secrecy::SecretString;

use sme_types::api::{ChatRequest, ConversationDetail, ConversationSummary, HealthStatus};
use sme_types::error::ChatError;

/// Raw response body of a streaming answer, chunked however the transport likes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send + 'static>>;

/// Remote generation service.
///
/// Implementations live in sme-infra (e.g., `HttpChatBackend`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatBackend: Send + Sync {
    /// Send a generation request and return the response body as raw bytes.
    ///
    /// Resolves once the response head has arrived. A 401/403 status must
    /// map to [`ChatError::AuthenticationRejected`]; any other non-2xx
    /// status to [`ChatError::Status`].
    fn open_stream(
        &self,
        request: &ChatRequest,
        token: &SecretString,
    ) -> impl std::future::Future<Output = Result<ByteStream, ChatError>> + Send;

    /// List conversation summaries known to the server.
    fn list_conversations(
        &self,
        token: Option<&SecretString>,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationSummary>, ChatError>> + Send;

    /// Fetch a conversation's full message history.
    ///
    /// A 404 maps to [`ChatError::NotFound`].
    fn fetch_conversation(
        &self,
        conversation_id: &str,
        token: Option<&SecretString>,
    ) -> impl std::future::Future<Output = Result<ConversationDetail, ChatError>> + Send;

    /// Delete a conversation on the server. A 404 maps to [`ChatError::NotFound`].
    fn delete_conversation(
        &self,
        conversation_id: &str,
        token: Option<&SecretString>,
    ) -> impl std::future::Future<Output = Result<(), ChatError>> + Send;

    /// Service and vector store health. Needs no credential.
    fn health(
        &self,
        detailed: bool,
    ) -> impl std::future::Future<Output = Result<HealthStatus, ChatError>> + Send;
}
