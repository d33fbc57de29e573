//! Events decoded from the generation service's response stream.
//!
//! Each `data: <json>` line of the stream carries one event, discriminated
//! by its `type` field:
//! 1. `token` -- an incremental piece of answer text
//! 2. `complete` -- the final answer text plus citations
//! 3. `error` -- a server-side failure; aborts the exchange
//!
//! Any other `type` decodes to [`StreamEvent::Unknown`] so newer servers do
//! not break older clients.

use serde::{Deserialize, Serialize};

use crate::conversation::SourceRef;

/// One structured record from the answer stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental answer text. The original backend names this `chunk`.
    #[serde(alias = "chunk")]
    Token {
        #[serde(default)]
        content: String,
    },

    /// The answer is finished.
    Complete {
        /// Server-declared final text; the client falls back to the
        /// accumulated tokens when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
        #[serde(default)]
        sources: Vec<SourceRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context_used: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<String>,
    },

    /// The server failed while generating.
    Error {
        #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    /// An event kind this client does not understand.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Short name of the event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Token { .. } => "token",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"token","content":"Hi"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Token {
                content: "Hi".to_string()
            }
        );
    }

    #[test]
    fn test_parse_chunk_alias() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"chunk","content":"Kafka"}"#).unwrap();
        assert_eq!(event.kind(), "token");
    }

    #[test]
    fn test_parse_complete_with_sources() {
        let json = r#"{"type":"complete","answer":"Done.","sources":[{"id":"s1","title":"Doc A"}],"context_used":3,"conversation_id":"abc"}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Complete {
                answer,
                sources,
                context_used,
                conversation_id,
            } => {
                assert_eq!(answer.as_deref(), Some("Done."));
                assert_eq!(sources.len(), 1);
                assert_eq!(sources[0].title, "Doc A");
                assert_eq!(context_used, Some(3));
                assert_eq!(conversation_id.as_deref(), Some("abc"));
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_complete_without_answer() {
        let event: StreamEvent = serde_json::from_str(r#"{"type":"complete"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Complete {
                answer: None,
                sources: Vec::new(),
                context_used: None,
                conversation_id: None,
            }
        );
    }

    #[test]
    fn test_complete_with_stray_content_key_keeps_answer() {
        let json = r#"{"type":"complete","answer":"A","content":"B","sources":[{"id":"s1","title":"Doc A"}]}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        match event {
            StreamEvent::Complete { answer, sources, .. } => {
                assert_eq!(answer.as_deref(), Some("A"));
                assert_eq!(sources.len(), 1);
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_message_alias() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"error","message":"boom"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Error {
                content: Some("boom".to_string())
            }
        );
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"heartbeat","ts":1}"#).unwrap();
        assert_eq!(event, StreamEvent::Unknown);
    }

    #[test]
    fn test_missing_type_is_an_error() {
        assert!(serde_json::from_str::<StreamEvent>(r#"{"content":"Hi"}"#).is_err());
    }
}
