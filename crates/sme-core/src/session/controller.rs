//! Session controller: drives one exchange at a time against the backend.
//!
//! An exchange moves `Idle -> Dispatching -> Streaming` and ends as
//! completed, failed, or cancelled, after which the controller is idle
//! again. [`SessionController::dispatch`] performs the synchronous part
//! (append the user message and an empty assistant placeholder) and
//! [`SessionController::drive`] consumes the response stream, writing the
//! growing answer into the placeholder as events arrive.
//!
//! Every exit path, including the caller dropping the `drive` future,
//! finalizes the exchange: loading is cleared and the placeholder never
//! stays blank.

use std::collections::HashMap;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use sme_types::api::{ChatRequest, ConversationSummary, HealthStatus};
use sme_types::conversation::{ConversationId, MessageId, MessageRole};
use sme_types::error::{APOLOGY_TEXT, CANCELLED_TEXT, ChatError, SubmitError};
use sme_types::event::StreamEvent;
use sme_types::session::{SessionPhase, SessionSnapshot};

use crate::backend::{ByteStream, ChatBackend};
use crate::credential::CredentialSource;
use crate::store::{ConversationStore, StoreChange};
use crate::stream::EventStream;

use super::history::conversation_from_detail;

const EMPTY_STREAM_MESSAGE: &str = "stream ended before any answer was produced";

/// An exchange that has been dispatched but not yet driven.
///
/// Must be handed to [`SessionController::drive`] or
/// [`SessionController::abandon`]; until then the controller reports busy.
#[derive(Debug)]
#[must_use = "a dispatched exchange keeps the session busy until it is driven or abandoned"]
pub struct PendingExchange {
    conversation_id: ConversationId,
    message_id: MessageId,
    request: ChatRequest,
}

impl PendingExchange {
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Id of the assistant placeholder the answer streams into.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Completed {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    Failed {
        conversation_id: ConversationId,
        message_id: MessageId,
        error: ChatError,
    },
    Cancelled {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
}

impl ExchangeOutcome {
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            ExchangeOutcome::Completed { conversation_id, .. }
            | ExchangeOutcome::Failed { conversation_id, .. }
            | ExchangeOutcome::Cancelled { conversation_id, .. } => *conversation_id,
        }
    }

    pub fn message_id(&self) -> MessageId {
        match self {
            ExchangeOutcome::Completed { message_id, .. }
            | ExchangeOutcome::Failed { message_id, .. }
            | ExchangeOutcome::Cancelled { message_id, .. } => *message_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed { .. })
    }

    pub fn error(&self) -> Option<&ChatError> {
        match self {
            ExchangeOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Terminal state reached by the streaming step.
#[derive(Debug)]
enum Settlement {
    Completed,
    Failed(ChatError),
    Cancelled,
}

/// Owns the conversation store and runs exchanges against a backend.
pub struct SessionController<B: ChatBackend, C: CredentialSource> {
    store: ConversationStore,
    backend: B,
    credentials: C,
    loading: bool,
    error: Option<String>,
    phase: SessionPhase,
    /// Server-side ids for conversations whose id differs from the local one.
    remote_ids: HashMap<ConversationId, String>,
}

impl<B: ChatBackend, C: CredentialSource> SessionController<B, C> {
    pub fn new(store: ConversationStore, backend: B, credentials: C) -> Self {
        Self {
            store,
            backend,
            credentials,
            loading: false,
            error: None,
            phase: SessionPhase::Idle,
            remote_ids: HashMap::new(),
        }
    }

    /// Read-only view of the conversation store.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Subscribe to store changes (live rendering of streamed answers).
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreChange> {
        self.store.subscribe()
    }

    pub fn session(&self) -> SessionSnapshot {
        SessionSnapshot {
            active_conversation: self.store.active_id(),
            loading: self.loading,
            error: self.error.clone(),
            phase: self.phase,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Clear the active pointer so the next submission opens a new conversation.
    ///
    /// Refused with `Busy` while an exchange is in flight.
    pub fn start_new_conversation(&mut self) -> Result<(), SubmitError> {
        if self.loading {
            return Err(SubmitError::Busy);
        }
        self.store.set_active(None);
        Ok(())
    }

    /// Id the server knows this conversation by.
    pub fn remote_id(&self, conversation_id: &ConversationId) -> String {
        self.remote_ids
            .get(conversation_id)
            .cloned()
            .unwrap_or_else(|| conversation_id.to_string())
    }

    /// Validate the utterance and perform the synchronous dispatch step.
    ///
    /// Rejections (`EmptyInput`, `Busy`) leave every piece of state untouched.
    pub fn dispatch(
        &mut self,
        utterance: &str,
        source_type: Option<&str>,
    ) -> Result<PendingExchange, SubmitError> {
        let text = utterance.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        if self.loading {
            tracing::debug!("submission rejected: exchange already in flight");
            return Err(SubmitError::Busy);
        }

        let active = self.store.active_conversation().map(|c| c.id);
        let conversation_id = match active {
            Some(id) => id,
            None => self.store.create_conversation(),
        };

        let user = self
            .store
            .append_message(&conversation_id, MessageRole::User, text, None);
        let placeholder = self
            .store
            .append_message(&conversation_id, MessageRole::Assistant, "", None);
        let (Some(_), Some(message_id)) = (user, placeholder) else {
            tracing::error!(
                conversation_id = %conversation_id,
                "active conversation vanished during dispatch"
            );
            return Err(SubmitError::Busy);
        };

        self.loading = true;
        self.phase = SessionPhase::Dispatching;

        let request = ChatRequest {
            message: text.to_string(),
            source_type: source_type.map(str::to_string),
            conversation_id: Some(self.remote_id(&conversation_id)),
            stream: true,
        };

        tracing::info!(
            conversation_id = %conversation_id,
            message_id = %message_id,
            source_type = request.source_type.as_deref().unwrap_or("all"),
            "exchange dispatched"
        );

        Ok(PendingExchange {
            conversation_id,
            message_id,
            request,
        })
    }

    /// Stream the answer for a dispatched exchange and finalize it.
    ///
    /// Cancelling `cancel` or dropping the returned future both finalize the
    /// exchange as cancelled.
    pub async fn drive(
        &mut self,
        pending: PendingExchange,
        cancel: CancellationToken,
    ) -> ExchangeOutcome {
        let mut in_flight = InFlight {
            controller: self,
            exchange: pending,
            armed: true,
        };
        let settlement = in_flight.run(&cancel).await;
        in_flight.settle(settlement)
    }

    /// Finalize a dispatched exchange without contacting the backend.
    pub fn abandon(&mut self, pending: PendingExchange) -> ExchangeOutcome {
        self.finalize(&pending, Settlement::Cancelled)
    }

    /// Dispatch and drive in one go with a fresh cancellation token.
    pub async fn submit(
        &mut self,
        utterance: &str,
        source_type: Option<&str>,
    ) -> Result<ExchangeOutcome, SubmitError> {
        let pending = self.dispatch(utterance, source_type)?;
        Ok(self.drive(pending, CancellationToken::new()).await)
    }

    /// List conversations known to the server.
    pub async fn refresh_conversations(&mut self) -> Result<Vec<ConversationSummary>, ChatError> {
        let token = self.credentials.bearer_token();
        let result = self.backend.list_conversations(token.as_ref()).await;
        self.check_auth(result)
    }

    /// Service health; no credential involved.
    pub async fn health(&self, detailed: bool) -> Result<HealthStatus, ChatError> {
        self.backend.health(detailed).await
    }

    /// Fetch a conversation from the server, import it, and make it active.
    pub async fn open_conversation(&mut self, remote_id: &str) -> Result<ConversationId, ChatError> {
        if self.loading {
            return Err(ChatError::Busy);
        }
        let token = self.credentials.bearer_token();
        let result = self.backend.fetch_conversation(remote_id, token.as_ref()).await;
        let detail = self.check_auth(result)?;

        let local_id = self.local_id_for(remote_id);
        let conversation = conversation_from_detail(local_id, detail, Utc::now());
        let message_count = conversation.messages.len();

        self.store.import_conversation(conversation);
        self.store.set_active(Some(local_id));
        self.remember_remote_id(local_id, remote_id);

        tracing::info!(
            conversation_id = %local_id,
            remote_id,
            message_count,
            "conversation opened"
        );
        Ok(local_id)
    }

    /// Delete a conversation on the server, then locally.
    ///
    /// A server 404 still deletes the local copy. Any other failure leaves
    /// local state untouched, as does calling this while an answer streams.
    pub async fn delete_conversation(&mut self, remote_id: &str) -> Result<(), ChatError> {
        if self.loading {
            return Err(ChatError::Busy);
        }
        let token = self.credentials.bearer_token();
        let result = self.backend.delete_conversation(remote_id, token.as_ref()).await;
        match self.check_auth(result) {
            Ok(()) => {}
            Err(ChatError::NotFound) => {
                tracing::debug!(remote_id, "conversation already gone on the server");
            }
            Err(e) => return Err(e),
        }

        let local_id = self.local_id_for(remote_id);
        self.store.delete_conversation(&local_id);
        self.remote_ids.remove(&local_id);
        Ok(())
    }

    /// Invalidate the credential when the server rejected it.
    fn check_auth<T>(&self, result: Result<T, ChatError>) -> Result<T, ChatError> {
        if let Err(e) = &result {
            if e.is_authentication() {
                tracing::warn!(error = %e, "credential rejected; clearing it");
                self.credentials.invalidate();
            }
        }
        result
    }

    /// Local id for a server id: a known mapping, the id itself when it is a
    /// UUID, or a freshly generated one.
    fn local_id_for(&self, remote_id: &str) -> ConversationId {
        if let Some((local, _)) = self.remote_ids.iter().find(|(_, r)| r.as_str() == remote_id) {
            return *local;
        }
        match Uuid::parse_str(remote_id) {
            Ok(uuid) => ConversationId(uuid),
            Err(_) => {
                let generated = ConversationId::new();
                tracing::debug!(
                    remote_id,
                    local_id = %generated,
                    "server conversation id is not a UUID; generated a local one"
                );
                generated
            }
        }
    }

    fn remember_remote_id(&mut self, local_id: ConversationId, remote_id: &str) {
        if local_id.to_string() != remote_id {
            self.remote_ids.insert(local_id, remote_id.to_string());
        }
    }

    /// Fold a settled exchange back into `Idle`.
    fn finalize(&mut self, exchange: &PendingExchange, settlement: Settlement) -> ExchangeOutcome {
        let conversation_id = exchange.conversation_id;
        let message_id = exchange.message_id;

        self.loading = false;
        self.phase = SessionPhase::Idle;

        match settlement {
            Settlement::Completed => {
                self.error = None;
                tracing::info!(conversation_id = %conversation_id, "exchange completed");
                ExchangeOutcome::Completed {
                    conversation_id,
                    message_id,
                }
            }
            Settlement::Failed(error) => {
                tracing::warn!(conversation_id = %conversation_id, error = %error, "exchange failed");
                if error.is_authentication() {
                    self.credentials.invalidate();
                }
                self.error = Some(error.user_message());
                self.fill_if_blank(&conversation_id, &message_id, APOLOGY_TEXT);
                ExchangeOutcome::Failed {
                    conversation_id,
                    message_id,
                    error,
                }
            }
            Settlement::Cancelled => {
                tracing::info!(conversation_id = %conversation_id, "exchange cancelled");
                self.fill_if_blank(&conversation_id, &message_id, CANCELLED_TEXT);
                ExchangeOutcome::Cancelled {
                    conversation_id,
                    message_id,
                }
            }
        }
    }

    fn fill_if_blank(&mut self, conversation_id: &ConversationId, message_id: &MessageId, text: &str) {
        let blank = self
            .store
            .conversation(conversation_id)
            .and_then(|c| c.message(message_id))
            .is_some_and(|m| m.content.trim().is_empty());
        if blank {
            self.store
                .replace_message_content(conversation_id, message_id, text, None);
        }
    }
}

/// Drop guard around an exchange being driven.
///
/// If the `drive` future is dropped before settling, the exchange is
/// finalized as cancelled.
struct InFlight<'a, B: ChatBackend, C: CredentialSource> {
    controller: &'a mut SessionController<B, C>,
    exchange: PendingExchange,
    armed: bool,
}

impl<B: ChatBackend, C: CredentialSource> InFlight<'_, B, C> {
    async fn run(&mut self, cancel: &CancellationToken) -> Settlement {
        let conversation_id = self.exchange.conversation_id;
        let message_id = self.exchange.message_id;
        let request = self.exchange.request.clone();

        let Some(token) = self.controller.credentials.bearer_token() else {
            return Settlement::Failed(ChatError::AuthenticationRequired);
        };

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Settlement::Cancelled,
            opened = self.controller.backend.open_stream(&request, &token) => opened,
        };
        let bytes = match opened {
            Ok(bytes) => bytes,
            Err(e) => return Settlement::Failed(e),
        };

        self.controller.phase = SessionPhase::Streaming;
        let mut events = EventStream::new(bytes);
        let settlement = self
            .consume(&mut events, cancel, conversation_id, message_id)
            .await;

        let malformed = events.malformed_count();
        if malformed > 0 {
            tracing::warn!(
                conversation_id = %conversation_id,
                malformed,
                "dropped malformed stream events during exchange"
            );
        }
        settlement
    }

    /// Apply decoded events to the placeholder until a terminal condition.
    async fn consume(
        &mut self,
        events: &mut EventStream<ByteStream>,
        cancel: &CancellationToken,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Settlement {
        let mut answer = String::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Settlement::Cancelled,
                next = events.next() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => return Settlement::Failed(e),
                None => break,
            };

            match event {
                StreamEvent::Token { content } => {
                    answer.push_str(&content);
                    self.controller.store.replace_message_content(
                        &conversation_id,
                        &message_id,
                        answer.as_str(),
                        None,
                    );
                }
                StreamEvent::Complete {
                    answer: declared,
                    sources,
                    context_used,
                    conversation_id: remote_id,
                } => {
                    let text = declared
                        .filter(|a| !a.trim().is_empty())
                        .unwrap_or(answer);
                    if text.trim().is_empty() {
                        return Settlement::Failed(ChatError::Transport(
                            EMPTY_STREAM_MESSAGE.to_string(),
                        ));
                    }

                    let source_count = sources.len();
                    let sources = (!sources.is_empty()).then_some(sources);
                    self.controller.store.replace_message_content(
                        &conversation_id,
                        &message_id,
                        text,
                        sources,
                    );

                    if let Some(remote_id) = remote_id.filter(|r| !r.is_empty()) {
                        self.controller.remember_remote_id(conversation_id, &remote_id);
                    }
                    tracing::debug!(
                        conversation_id = %conversation_id,
                        source_count,
                        context_used = context_used.unwrap_or_default(),
                        "answer complete"
                    );
                    return Settlement::Completed;
                }
                StreamEvent::Error { content } => {
                    let message = content
                        .filter(|c| !c.trim().is_empty())
                        .unwrap_or_else(|| "the server reported an error".to_string());
                    return Settlement::Failed(ChatError::Stream(message));
                }
                StreamEvent::Unknown => {
                    tracing::debug!(conversation_id = %conversation_id, "ignoring unknown stream event");
                }
            }
        }

        if answer.trim().is_empty() {
            Settlement::Failed(ChatError::Transport(EMPTY_STREAM_MESSAGE.to_string()))
        } else {
            tracing::debug!(
                conversation_id = %conversation_id,
                "stream ended without a complete event; keeping streamed text"
            );
            Settlement::Completed
        }
    }

    fn settle(mut self, settlement: Settlement) -> ExchangeOutcome {
        self.armed = false;
        self.controller.finalize(&self.exchange, settlement)
    }
}

impl<B: ChatBackend, C: CredentialSource> Drop for InFlight<'_, B, C> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(
                conversation_id = %self.exchange.conversation_id,
                "exchange abandoned mid-stream"
            );
            self.controller.finalize(&self.exchange, Settlement::Cancelled);
        }
    }
}
