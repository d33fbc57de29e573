//! Mapping of fetched conversation history into domain types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sme_types::api::{ConversationDetail, WireMessage};
use sme_types::conversation::{Conversation, ConversationId, Message, MessageId, MessageRole};

use crate::store::number_sources;

/// Map a fetched conversation 1:1 onto a [`Conversation`] with the given local id.
///
/// Message order is kept. Missing timestamps fall back to the
/// conversation's own, then to `now`.
pub fn conversation_from_detail(
    id: ConversationId,
    detail: ConversationDetail,
    now: DateTime<Utc>,
) -> Conversation {
    let created_at = detail
        .created_at
        .or_else(|| detail.messages.first().and_then(|m| m.created_at))
        .unwrap_or(now);

    let messages: Vec<Message> = detail
        .messages
        .into_iter()
        .map(|wire| message_from_wire(wire, created_at))
        .collect();

    let updated_at = detail
        .updated_at
        .or_else(|| messages.last().map(|m| m.created_at))
        .unwrap_or(created_at)
        .max(created_at);

    Conversation {
        id,
        title: detail.title.filter(|t| !t.trim().is_empty()),
        messages,
        created_at,
        updated_at,
    }
}

/// Map one wire message, generating an id when the server's is not a UUID.
pub fn message_from_wire(wire: WireMessage, fallback_time: DateTime<Utc>) -> Message {
    let id = match wire.id.as_deref().map(Uuid::parse_str) {
        Some(Ok(uuid)) => MessageId(uuid),
        Some(Err(_)) => {
            let generated = MessageId::new();
            tracing::debug!(
                remote_id = wire.id.as_deref().unwrap_or_default(),
                local_id = %generated,
                "server message id is not a UUID; generated a local one"
            );
            generated
        }
        None => MessageId::new(),
    };

    let sources = match wire.role {
        MessageRole::Assistant => wire.sources.filter(|s| !s.is_empty()).map(number_sources),
        MessageRole::User => None,
    };

    Message {
        id,
        role: wire.role,
        content: wire.content,
        sources,
        created_at: wire.created_at.unwrap_or(fallback_time),
    }
}
