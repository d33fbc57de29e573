//! Conversation, message, and source reference types.
//!
//! These types model the client-side view of a chat history: a conversation
//! is an ordered list of user/assistant messages, and assistant messages may
//! carry citations pointing at the material the answer was generated from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Maximum number of characters kept when deriving a title from a message.
pub const TITLE_MAX_CHARS: usize = 60;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Unique identifier for a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A citation attached to an assistant message.
///
/// Purely descriptive: once attached to a message it is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_source_title")]
    pub title: String,
    /// Locator for the material. The backend sends `""` when there is none.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub url: Option<String>,
    #[serde(default = "default_source_type")]
    pub source_type: String,
    /// Position hint inside the source document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
}

impl SourceRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: None,
            source_type: default_source_type(),
            chunk_index: None,
            similarity_score: None,
        }
    }
}

fn default_source_title() -> String {
    "Untitled".to_string()
}

fn default_source_type() -> String {
    "unknown".to_string()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// A single turn within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    /// Citations; only ever set on assistant messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Number of attached sources (zero when none were delivered).
    pub fn source_count(&self) -> usize {
        self.sources.as_ref().map_or(0, Vec::len)
    }
}

/// An ordered collection of messages.
///
/// Invariant: `updated_at >= created_at`, and `messages` is kept in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation stamped with the given time.
    pub fn new(id: ConversationId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Find a message by id.
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// The most recently appended message.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Display title, falling back to a placeholder.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }
}

/// Derive a short conversation title from the first user message.
///
/// Collapses whitespace and truncates to [`TITLE_MAX_CHARS`] characters,
/// appending an ellipsis when truncated. Returns `None` for blank input.
pub fn derive_title(content: &str) -> Option<String> {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    if collapsed.chars().count() <= TITLE_MAX_CHARS {
        return Some(collapsed);
    }

    let truncated: String = collapsed.chars().take(TITLE_MAX_CHARS - 3).collect();
    Some(format!("{}...", truncated.trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_roundtrip() {
        for role in [MessageRole::User, MessageRole::Assistant] {
            let s = role.to_string();
            let parsed: MessageRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
        assert!("system".parse::<MessageRole>().is_err());
    }

    #[test]
    fn test_message_role_serde() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_source_ref_defaults_from_backend_shape() {
        let json = r#"{"title":"Kafka Replication","url":"","source_type":"confluence","similarity_score":0.82}"#;
        let source: SourceRef = serde_json::from_str(json).unwrap();
        assert_eq!(source.id, "");
        assert_eq!(source.title, "Kafka Replication");
        assert!(source.url.is_none());
        assert_eq!(source.source_type, "confluence");
        assert_eq!(source.similarity_score, Some(0.82));
    }

    #[test]
    fn test_source_ref_minimal() {
        let source: SourceRef = serde_json::from_str(r#"{"id":"s1"}"#).unwrap();
        assert_eq!(source.id, "s1");
        assert_eq!(source.title, "Untitled");
        assert_eq!(source.source_type, "unknown");
        assert!(source.chunk_index.is_none());
    }

    #[test]
    fn test_conversation_id_parse() {
        let id = ConversationId::new();
        let parsed: ConversationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<ConversationId>().is_err());
    }

    #[test]
    fn test_derive_title_short() {
        assert_eq!(
            derive_title("  What is   replication? "),
            Some("What is replication?".to_string())
        );
        assert_eq!(derive_title("   "), None);
    }

    #[test]
    fn test_derive_title_truncates_on_char_boundary() {
        let long = "ü".repeat(100);
        let title = derive_title(&long).unwrap();
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_new_conversation_timestamps() {
        let now = Utc::now();
        let conv = Conversation::new(ConversationId::new(), now);
        assert_eq!(conv.created_at, conv.updated_at);
        assert!(conv.messages.is_empty());
        assert_eq!(conv.display_title(), "(untitled)");
    }
}
