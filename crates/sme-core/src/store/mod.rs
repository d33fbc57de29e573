//! In-memory conversation store.
//!
//! `ConversationStore` exclusively owns every conversation and message the
//! client knows about. It is mutated only through the operations below,
//! which keeps message order append-only and `updated_at` monotonic. Every
//! mutation that changes observable state is published on the change feed.

pub mod feed;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use sme_types::conversation::{
    Conversation, ConversationId, Message, MessageId, MessageRole, SourceRef, derive_title,
};

pub use feed::{ChangeFeed, StoreChange};

/// Owner of all conversations plus the active-conversation pointer.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: HashMap<ConversationId, Conversation>,
    active: Option<ConversationId>,
    feed: ChangeFeed,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every future store mutation.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreChange> {
        self.feed.subscribe()
    }

    /// Create an empty conversation and make it active.
    pub fn create_conversation(&mut self) -> ConversationId {
        let id = ConversationId::new();
        self.conversations
            .insert(id, Conversation::new(id, Utc::now()));
        self.feed
            .publish(StoreChange::ConversationCreated { conversation_id: id });

        self.active = Some(id);
        self.feed
            .publish(StoreChange::ActiveChanged { active: Some(id) });

        tracing::debug!(conversation_id = %id, "conversation created");
        id
    }

    /// Append a message with a fresh id and the current timestamp.
    ///
    /// Returns `None` (and changes nothing) when the conversation is unknown.
    /// Sources are only kept on assistant messages.
    pub fn append_message(
        &mut self,
        conversation_id: &ConversationId,
        role: MessageRole,
        content: impl Into<String>,
        sources: Option<Vec<SourceRef>>,
    ) -> Option<MessageId> {
        let conversation = self.conversations.get_mut(conversation_id)?;

        let now = Utc::now();
        let message = Message {
            id: MessageId::new(),
            role,
            content: content.into(),
            sources: match role {
                MessageRole::Assistant => sources.map(number_sources),
                MessageRole::User => None,
            },
            created_at: now,
        };

        if conversation.title.is_none() && role == MessageRole::User {
            conversation.title = derive_title(&message.content);
        }
        conversation.updated_at = advance(conversation.updated_at, now);
        conversation.messages.push(message.clone());

        let id = message.id;
        self.feed.publish(StoreChange::MessageAppended {
            conversation_id: *conversation_id,
            message,
        });
        Some(id)
    }

    /// Replace the content (and, once, the sources) of the streaming target.
    ///
    /// Only the most recently appended message of a conversation may be
    /// replaced, and only if it is an assistant message. Sources are attached
    /// only if the message has none yet. Returns whether anything changed;
    /// a replace that changes nothing publishes nothing.
    pub fn replace_message_content(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        content: impl Into<String>,
        sources: Option<Vec<SourceRef>>,
    ) -> bool {
        let Some(conversation) = self.conversations.get_mut(conversation_id) else {
            return false;
        };
        let Some(message) = conversation.messages.last_mut() else {
            return false;
        };
        if &message.id != message_id || message.role != MessageRole::Assistant {
            return false;
        }

        let content = content.into();
        let mut changed = false;

        if message.content != content {
            message.content = content;
            changed = true;
        }
        if message.sources.is_none() {
            if let Some(sources) = sources {
                message.sources = Some(number_sources(sources));
                changed = true;
            }
        }

        if !changed {
            return false;
        }

        let updated = message.clone();
        conversation.updated_at = advance(conversation.updated_at, Utc::now());
        self.feed.publish(StoreChange::MessageUpdated {
            conversation_id: *conversation_id,
            message: updated,
        });
        true
    }

    /// Remove a conversation. Clears the active pointer if it pointed here.
    pub fn delete_conversation(&mut self, conversation_id: &ConversationId) -> bool {
        if self.conversations.remove(conversation_id).is_none() {
            return false;
        }
        self.feed.publish(StoreChange::ConversationDeleted {
            conversation_id: *conversation_id,
        });

        if self.active.as_ref() == Some(conversation_id) {
            self.active = None;
            self.feed.publish(StoreChange::ActiveChanged { active: None });
        }

        tracing::debug!(conversation_id = %conversation_id, "conversation deleted");
        true
    }

    /// All conversations, most recently updated first.
    ///
    /// Ties on `updated_at` are broken by `created_at`, then by id, both
    /// descending.
    pub fn list_conversations(&self) -> Vec<&Conversation> {
        let mut list: Vec<&Conversation> = self.conversations.values().collect();
        list.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        list
    }

    /// Point the session at a conversation, or at none.
    ///
    /// Unknown ids are ignored. Returns whether the pointer moved.
    pub fn set_active(&mut self, conversation_id: Option<ConversationId>) -> bool {
        if conversation_id.is_some_and(|id| !self.conversations.contains_key(&id)) {
            return false;
        }
        if self.active == conversation_id {
            return false;
        }

        self.active = conversation_id;
        self.feed.publish(StoreChange::ActiveChanged {
            active: conversation_id,
        });
        true
    }

    /// Insert or replace a conversation fetched from the backend.
    ///
    /// Message order is kept as given and the active pointer is untouched.
    pub fn import_conversation(&mut self, mut conversation: Conversation) -> ConversationId {
        if conversation.title.is_none() {
            conversation.title = conversation
                .messages
                .iter()
                .find(|m| m.role == MessageRole::User)
                .and_then(|m| derive_title(&m.content));
        }
        conversation.updated_at = advance(conversation.updated_at, conversation.created_at);

        let id = conversation.id;
        self.conversations.insert(id, conversation);
        self.feed
            .publish(StoreChange::ConversationImported { conversation_id: id });
        id
    }

    pub fn conversation(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.conversations.get(conversation_id)
    }

    pub fn active_id(&self) -> Option<ConversationId> {
        self.active
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.as_ref().and_then(|id| self.conversations.get(id))
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

/// `updated_at` never moves backwards.
fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    previous.max(now)
}

/// Give sources without an id a positional one ("1", "2", ...).
pub(crate) fn number_sources(sources: Vec<SourceRef>) -> Vec<SourceRef> {
    sources
        .into_iter()
        .enumerate()
        .map(|(i, mut source)| {
            if source.id.trim().is_empty() {
                source.id = (i + 1).to_string();
            }
            source
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store_with_exchange() -> (ConversationStore, ConversationId, MessageId) {
        let mut store = ConversationStore::new();
        let conv = store.create_conversation();
        store
            .append_message(&conv, MessageRole::User, "What is replication?", None)
            .unwrap();
        let placeholder = store
            .append_message(&conv, MessageRole::Assistant, "", None)
            .unwrap();
        (store, conv, placeholder)
    }

    #[test]
    fn test_create_conversation_becomes_active() {
        let mut store = ConversationStore::new();
        let id = store.create_conversation();
        assert_eq!(store.active_id(), Some(id));
        assert_eq!(store.len(), 1);
        assert!(store.active_conversation().unwrap().messages.is_empty());
    }

    #[test]
    fn test_append_preserves_order_and_titles_from_first_user_message() {
        let (store, conv, placeholder) = store_with_exchange();
        let conversation = store.conversation(&conv).unwrap();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, MessageRole::User);
        assert_eq!(conversation.messages[1].id, placeholder);
        assert_eq!(conversation.title.as_deref(), Some("What is replication?"));
    }

    #[test]
    fn test_append_to_unknown_conversation_is_ignored() {
        let mut store = ConversationStore::new();
        let mut rx = store.subscribe();
        let result =
            store.append_message(&ConversationId::new(), MessageRole::User, "hello", None);
        assert!(result.is_none());
        assert!(store.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_user_message_sources_are_dropped() {
        let mut store = ConversationStore::new();
        let conv = store.create_conversation();
        let id = store
            .append_message(
                &conv,
                MessageRole::User,
                "hi",
                Some(vec![SourceRef::new("s1", "Doc")]),
            )
            .unwrap();
        let message = store.conversation(&conv).unwrap().message(&id).unwrap();
        assert!(message.sources.is_none());
    }

    #[test]
    fn test_replace_is_idempotent() {
        let (mut store, conv, placeholder) = store_with_exchange();

        assert!(store.replace_message_content(&conv, &placeholder, "Hi there", None));
        let once = store.conversation(&conv).unwrap().clone();

        assert!(!store.replace_message_content(&conv, &placeholder, "Hi there", None));
        let twice = store.conversation(&conv).unwrap().clone();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_replace_guards() {
        let (mut store, conv, placeholder) = store_with_exchange();
        let user_id = store.conversation(&conv).unwrap().messages[0].id;

        // User messages are immutable.
        assert!(!store.replace_message_content(&conv, &user_id, "edited", None));
        // Unknown ids.
        assert!(!store.replace_message_content(&ConversationId::new(), &placeholder, "x", None));
        assert!(!store.replace_message_content(&conv, &MessageId::new(), "x", None));

        // Once another message lands, the old placeholder is no longer the target.
        let next = store
            .append_message(&conv, MessageRole::Assistant, "", None)
            .unwrap();
        assert!(!store.replace_message_content(&conv, &placeholder, "late", None));
        assert!(store.replace_message_content(&conv, &next, "fresh", None));

        let conversation = store.conversation(&conv).unwrap();
        assert_eq!(conversation.messages[0].content, "What is replication?");
        assert_eq!(conversation.messages[1].content, "");
    }

    #[test]
    fn test_sources_attach_once_with_positional_ids() {
        let (mut store, conv, placeholder) = store_with_exchange();
        let mut untitled = SourceRef::new("", "Doc B");
        untitled.url = Some("https://wiki/b".to_string());

        assert!(store.replace_message_content(
            &conv,
            &placeholder,
            "Answer",
            Some(vec![SourceRef::new("s1", "Doc A"), untitled]),
        ));
        assert!(!store.replace_message_content(
            &conv,
            &placeholder,
            "Answer",
            Some(vec![SourceRef::new("s9", "Other")]),
        ));

        let message = store.conversation(&conv).unwrap().message(&placeholder).unwrap();
        let sources = message.sources.as_ref().unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].id, "s1");
        assert_eq!(sources[1].id, "2");
    }

    #[test]
    fn test_updated_at_is_monotonic() {
        let (mut store, conv, placeholder) = store_with_exchange();
        let before = store.conversation(&conv).unwrap().updated_at;

        store.replace_message_content(&conv, &placeholder, "a", None);
        let after = store.conversation(&conv).unwrap().updated_at;
        assert!(after >= before);
        assert!(after >= store.conversation(&conv).unwrap().created_at);
    }

    #[test]
    fn test_list_sorted_by_updated_at_desc() {
        let mut store = ConversationStore::new();
        let an_hour_ago = Utc::now() - Duration::hours(1);
        let first = store.import_conversation(Conversation::new(
            ConversationId::new(),
            an_hour_ago - Duration::minutes(5),
        ));
        let second =
            store.import_conversation(Conversation::new(ConversationId::new(), an_hour_ago));

        let listed: Vec<ConversationId> =
            store.list_conversations().iter().map(|c| c.id).collect();
        assert_eq!(listed, vec![second, first]);

        // Touch the older conversation so it becomes the most recent.
        store.append_message(&first, MessageRole::User, "bump", None);

        let listed: Vec<ConversationId> =
            store.list_conversations().iter().map(|c| c.id).collect();
        assert_eq!(listed, vec![first, second]);

        let list = store.list_conversations();
        for pair in list.windows(2) {
            assert!(pair[0].updated_at >= pair[1].updated_at);
        }
    }

    #[test]
    fn test_list_ties_broken_by_created_at() {
        let mut store = ConversationStore::new();
        let stamp = Utc::now();
        let mut older = Conversation::new(ConversationId::new(), stamp - Duration::seconds(10));
        older.updated_at = stamp;
        let newer = Conversation::new(ConversationId::new(), stamp);
        store.import_conversation(older.clone());
        store.import_conversation(newer.clone());

        let listed: Vec<ConversationId> =
            store.list_conversations().iter().map(|c| c.id).collect();
        assert_eq!(listed, vec![newer.id, older.id]);
    }

    #[test]
    fn test_delete_active_clears_pointer() {
        let (mut store, conv, _) = store_with_exchange();
        assert!(store.delete_conversation(&conv));
        assert_eq!(store.active_id(), None);
        assert!(store.list_conversations().iter().all(|c| c.id != conv));
        assert!(!store.delete_conversation(&conv));
    }

    #[test]
    fn test_delete_inactive_keeps_pointer() {
        let mut store = ConversationStore::new();
        let first = store.create_conversation();
        let second = store.create_conversation();
        assert!(store.delete_conversation(&first));
        assert_eq!(store.active_id(), Some(second));
    }

    #[test]
    fn test_set_active_ignores_unknown() {
        let mut store = ConversationStore::new();
        let id = store.create_conversation();
        assert!(!store.set_active(Some(ConversationId::new())));
        assert_eq!(store.active_id(), Some(id));
        assert!(store.set_active(None));
        assert_eq!(store.active_id(), None);
        assert!(!store.set_active(None));
    }

    #[test]
    fn test_import_keeps_active_and_order() {
        let mut store = ConversationStore::new();
        let active = store.create_conversation();

        let now = Utc::now();
        let mut imported = Conversation::new(ConversationId::new(), now);
        for (role, text) in [(MessageRole::User, "Q1"), (MessageRole::Assistant, "A1")] {
            imported.messages.push(Message {
                id: MessageId::new(),
                role,
                content: text.to_string(),
                sources: None,
                created_at: now,
            });
        }
        let id = store.import_conversation(imported);

        assert_eq!(store.active_id(), Some(active));
        let conversation = store.conversation(&id).unwrap();
        assert_eq!(conversation.messages[0].content, "Q1");
        assert_eq!(conversation.title.as_deref(), Some("Q1"));
    }

    #[test]
    fn test_change_feed_order_and_no_op_silence() {
        let mut store = ConversationStore::new();
        let mut rx = store.subscribe();

        let conv = store.create_conversation();
        let msg = store
            .append_message(&conv, MessageRole::Assistant, "", None)
            .unwrap();
        store.replace_message_content(&conv, &msg, "Hi", None);
        store.replace_message_content(&conv, &msg, "Hi", None);
        store.set_active(Some(conv));
        store.delete_conversation(&conv);

        let mut kinds = Vec::new();
        while let Ok(change) = rx.try_recv() {
            kinds.push(match change {
                StoreChange::ConversationCreated { .. } => "created",
                StoreChange::MessageAppended { .. } => "appended",
                StoreChange::MessageUpdated { .. } => "updated",
                StoreChange::ConversationDeleted { .. } => "deleted",
                StoreChange::ConversationImported { .. } => "imported",
                StoreChange::ActiveChanged { .. } => "active",
            });
        }
        assert_eq!(
            kinds,
            vec!["created", "active", "appended", "updated", "deleted", "active"]
        );
    }

    #[test]
    fn test_message_updated_carries_content() {
        let (mut store, conv, placeholder) = store_with_exchange();
        let mut rx = store.subscribe();
        store.replace_message_content(&conv, &placeholder, "Partial", None);

        match rx.try_recv().unwrap() {
            StoreChange::MessageUpdated { message, .. } => {
                assert_eq!(message.id, placeholder);
                assert_eq!(message.content, "Partial");
            }
            other => panic!("expected MessageUpdated, got {other:?}"),
        }
    }
}
