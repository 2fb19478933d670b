//! crates/docchat_core/src/cache.rs
//!
//! The per-document session chat cache: gives a chat view an immediately
//! available message list without a store round trip, for the lifetime of
//! the process. Explicitly not a source of truth: the chat log store stays
//! authoritative for anything that must survive a restart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::Sender;

/// One line of a cached per-document thread.
///
/// Never persisted; `id` is a render key only and lives in a different id
/// space than store-assigned row ids.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl CachedMessage {
    /// Builds a message stamped at call time with a fresh render key.
    pub fn now(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct DocumentThread {
    messages: Vec<CachedMessage>,
    last_message: Option<String>,
    last_activity: Option<DateTime<Utc>>,
}

/// In-process message buffer keyed by document id.
///
/// All operations are infallible, pure in-memory mutation. The service holds
/// one instance behind a lock for the lifetime of the process.
#[derive(Debug, Default)]
pub struct ChatCache {
    threads: HashMap<i64, DocumentThread>,
}

impl ChatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the entry for `document_id` with a single synthesized AI
    /// greeting referencing `document_name`, timestamped at call time.
    ///
    /// Idempotent: an entry that already exists is left untouched, including
    /// anything appended to it since.
    pub fn initialize(&mut self, document_id: i64, document_name: &str) {
        self.threads
            .entry(document_id)
            .or_insert_with(|| DocumentThread {
                messages: vec![CachedMessage::now(Sender::Ai, greeting(document_name))],
                last_message: None,
                last_activity: None,
            });
    }

    /// Appends to the end of the document's thread and refreshes the
    /// last-message summary fields.
    ///
    /// No ordering check is performed; callers append in true chronological
    /// order.
    pub fn append(&mut self, document_id: i64, message: CachedMessage) {
        let thread = self.threads.entry(document_id).or_default();
        thread.last_message = Some(message.text.clone());
        thread.last_activity = Some(message.timestamp);
        thread.messages.push(message);
    }

    /// The full ordered thread, or empty if the document was never visited.
    pub fn messages(&self, document_id: i64) -> Vec<CachedMessage> {
        self.threads
            .get(&document_id)
            .map(|thread| thread.messages.clone())
            .unwrap_or_default()
    }

    /// Text of the most recently appended message. The seeded greeting is
    /// synthesized, not appended, so this stays `None` until the first
    /// append.
    pub fn last_message(&self, document_id: i64) -> Option<String> {
        self.threads
            .get(&document_id)
            .and_then(|thread| thread.last_message.clone())
    }

    /// Timestamp of the most recently appended message.
    pub fn last_activity(&self, document_id: i64) -> Option<DateTime<Utc>> {
        self.threads
            .get(&document_id)
            .and_then(|thread| thread.last_activity)
    }
}

fn greeting(document_name: &str) -> String {
    format!("Hi! I've finished reading \"{document_name}\". Ask me anything about it.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_message(text: &str) -> CachedMessage {
        CachedMessage::now(Sender::User, text)
    }

    #[test]
    fn initialize_seeds_exactly_one_greeting() {
        let mut cache = ChatCache::new();
        cache.initialize(7, "report.pdf");

        let messages = cache.messages(7);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Ai);
        assert!(messages[0].text.contains("report.pdf"));
    }

    #[test]
    fn initialize_twice_with_intervening_append_keeps_history() {
        let mut cache = ChatCache::new();
        cache.initialize(7, "report.pdf");
        cache.append(7, user_message("What is this about?"));
        cache.initialize(7, "report.pdf");

        let messages = cache.messages(7);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "What is this about?");
    }

    #[test]
    fn appends_come_back_in_order() {
        let mut cache = ChatCache::new();
        cache.initialize(3, "notes.pdf");
        for i in 0..5 {
            cache.append(3, user_message(&format!("question {i}")));
        }

        let messages = cache.messages(3);
        assert_eq!(messages.len(), 6); // greeting + 5 appends
        for (i, message) in messages.iter().skip(1).enumerate() {
            assert_eq!(message.text, format!("question {i}"));
        }
    }

    #[test]
    fn messages_empty_for_unknown_document() {
        let cache = ChatCache::new();
        assert!(cache.messages(42).is_empty());
        assert_eq!(cache.last_message(42), None);
        assert_eq!(cache.last_activity(42), None);
    }

    #[test]
    fn last_message_tracks_appends_not_the_greeting() {
        let mut cache = ChatCache::new();
        cache.initialize(1, "a.pdf");
        assert_eq!(cache.last_message(1), None);

        let message = user_message("hello");
        let stamp = message.timestamp;
        cache.append(1, message);

        assert_eq!(cache.last_message(1).as_deref(), Some("hello"));
        assert_eq!(cache.last_activity(1), Some(stamp));
    }

    #[test]
    fn append_without_initialize_starts_a_bare_thread() {
        let mut cache = ChatCache::new();
        cache.append(9, user_message("direct"));

        let messages = cache.messages(9);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "direct");
    }

    #[test]
    fn threads_are_independent_per_document() {
        let mut cache = ChatCache::new();
        cache.initialize(1, "a.pdf");
        cache.initialize(2, "b.pdf");
        cache.append(1, user_message("only for a"));

        assert_eq!(cache.messages(1).len(), 2);
        assert_eq!(cache.messages(2).len(), 1);
        assert_eq!(cache.last_message(2), None);
    }
}
