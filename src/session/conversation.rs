//! Conversations and their store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::chat::message::{Message, Sender};

/// Default inactivity timeout (30 minutes).
pub const DEFAULT_CONVERSATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// The recorded turns of one widget session.
///
/// Cloning is cheap; clones share the same history.
#[derive(Debug, Clone)]
pub struct Conversation {
    inner: Arc<ConversationInner>,
}

#[derive(Debug)]
struct ConversationInner {
    id: String,
    turns: RwLock<Vec<Message>>,
    created_at: DateTime<Utc>,
    last_activity: RwLock<DateTime<Utc>>,
}

impl Conversation {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(ConversationInner {
                id,
                turns: RwLock::new(Vec::new()),
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user_message(&self, content: impl Into<String>) {
        self.add_message(Message::user(content));
    }

    pub fn add_bot_message(&self, content: impl Into<String>) {
        self.add_message(Message::bot(content));
    }

    /// Record a message. Transient placeholders are never recorded.
    pub fn add_message(&self, message: Message) {
        if message.is_transient {
            return;
        }
        let mut guard = self
            .inner
            .turns
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.push(message);
        drop(guard);
        self.touch();
    }

    /// All recorded turns in order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner
            .turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner
            .turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The most recent message from `sender`.
    #[must_use]
    pub fn last_from(&self, sender: Sender) -> Option<Message> {
        self.inner
            .turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|m| m.sender == sender)
            .cloned()
    }

    fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Utc::now();
    }

    /// Whether the conversation has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        // A negative idle time means clock skew; treat as active.
        (Utc::now() - self.last_activity())
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }
}

/// Thread-safe map of conversations keyed by the client's session id.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    inner: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Conversation> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Get the conversation for `id`, creating it on first use.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> Conversation {
        if let Some(conversation) = self.get(id) {
            return conversation;
        }

        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard
            .entry(id.to_string())
            .or_insert_with(|| Conversation::new(id.to_string()))
            .clone()
    }

    pub fn remove(&self, id: &str) -> Option<Conversation> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop conversations idle for longer than `timeout`.
    ///
    /// Returns the number removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, conversation| !conversation.is_expired_with_timeout(timeout));
        before - guard.len()
    }

    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_with_timeout(DEFAULT_CONVERSATION_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_records_turns() {
        let conversation = Conversation::new("abc".to_string());
        assert_eq!(conversation.id(), "abc");

        conversation.add_user_message("hello");
        conversation.add_bot_message("Hi!");
        conversation.add_message(Message::typing());

        let messages = conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].sender, Sender::Bot);
        assert_eq!(conversation.last_from(Sender::User).unwrap().content, "hello");
        assert!(conversation.last_activity() >= conversation.created_at());
    }

    #[test]
    fn test_store_get_or_create_is_stable() {
        let store = ConversationStore::new();
        assert!(store.is_empty());

        let first = store.get_or_create("s1");
        first.add_user_message("hi");
        let again = store.get_or_create("s1");

        assert_eq!(store.len(), 1);
        assert_eq!(again.message_count(), 1);
        assert!(store.get("s2").is_none());

        assert!(store.remove("s1").is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let store = ConversationStore::new();
        let _ = store.get_or_create("old");
        std::thread::sleep(Duration::from_millis(20));
        let _ = store.get_or_create("new");

        assert_eq!(store.cleanup_expired_with_timeout(Duration::from_millis(10)), 1);
        assert!(store.get("new").is_some());
        assert!(store.get("old").is_none());
        assert_eq!(store.cleanup_expired(), 0);
    }
}
