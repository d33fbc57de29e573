//! Change feed for the conversation store.
//!
//! Each subscriber gets its own unbounded channel, so every change reaches
//! every live subscriber exactly once and in mutation order. Subscribers
//! whose receiver was dropped are pruned on the next publish.

use sme_types::conversation::{ConversationId, Message};
use tokio::sync::mpsc;

/// One observable mutation of the conversation store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    ConversationCreated {
        conversation_id: ConversationId,
    },
    MessageAppended {
        conversation_id: ConversationId,
        message: Message,
    },
    /// The streaming target's content (and possibly sources) changed.
    MessageUpdated {
        conversation_id: ConversationId,
        message: Message,
    },
    ConversationDeleted {
        conversation_id: ConversationId,
    },
    ConversationImported {
        conversation_id: ConversationId,
    },
    ActiveChanged {
        active: Option<ConversationId>,
    },
}

/// Fan-out publisher of [`StoreChange`] notifications.
#[derive(Default)]
pub struct ChangeFeed {
    subscribers: Vec<mpsc::UnboundedSender<StoreChange>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new subscriber that will receive all future changes.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver a change to every live subscriber.
    ///
    /// With no subscribers the change is dropped.
    pub fn publish(&mut self, change: StoreChange) {
        self.subscribers
            .retain(|tx| tx.send(change.clone()).is_ok());
    }

    /// Number of subscribers still attached as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscriber_count", &self.subscribers.len())
            .finish()
    }
}
