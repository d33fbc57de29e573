//! Wire DTOs for the generation service's HTTP API.
//!
//! These mirror the JSON shapes the backend accepts and returns. They are
//! kept separate from the domain types in [`crate::conversation`] so the
//! client can tolerate the backend's looser field naming (`timestamp` vs
//! `created_at`, `conversation_id` vs `id`, wrapped vs bare lists).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::conversation::{MessageRole, SourceRef};

/// Body of `POST /api/chat/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Restrict retrieval to one source kind (e.g. "confluence", "github").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

/// Summary row returned by the conversation listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(alias = "conversation_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: Option<u32>,
}

/// The listing endpoint answers either `{"conversations": [...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConversationListResponse {
    Wrapped {
        conversations: Vec<ConversationSummary>,
    },
    Bare(Vec<ConversationSummary>),
}

impl ConversationListResponse {
    pub fn into_summaries(self) -> Vec<ConversationSummary> {
        match self {
            ConversationListResponse::Wrapped { conversations } => conversations,
            ConversationListResponse::Bare(conversations) => conversations,
        }
    }
}

/// A single message inside a fetched conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub sources: Option<Vec<SourceRef>>,
    #[serde(default, alias = "timestamp", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Full history returned by `GET /api/chat/conversations/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(alias = "conversation_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `GET /api/health/` and `GET /api/health/detailed`.
///
/// The detailed form adds document counts to `vector_db`, and reports
/// `status = "degraded"` with `vector_db.error` when the store is unreachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub vector_db: Option<VectorDbHealth>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorDbHealth {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub documents: Option<u64>,
    #[serde(default)]
    pub collection: Option<String>,
    /// Document count per source kind.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_breakdown: BTreeMap<String, u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Accept RFC 3339 timestamps as well as naive ISO-8601 ones (assumed UTC).
///
/// Unparseable values become `None` rather than failing the whole payload.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    Ok(NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}
