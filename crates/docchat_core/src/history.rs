//! crates/docchat_core/src/history.rs
//!
//! Session reconstruction and the chat-history fold.
//!
//! A session is whatever rows share a `chat_id` for one owner; the functions
//! here define the canonical ordering of those rows and the aggregation the
//! history list view is built from.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ChatMessage, Sender};

/// Aggregate view of one chat session for the history list.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub chat_id: Uuid,
    pub document_ids: Vec<i64>,
    pub last_message: String,
    pub last_sender: Sender,
    pub last_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Restores the canonical order of a thread: `created_at` ascending, with
/// the store-assigned row id as tiebreak for rows written in the same
/// instant. Every code path that reconstructs a session must use this
/// ordering to reproduce what was actually said.
pub fn sort_thread(messages: &mut [ChatMessage]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

/// The document set of a session: taken from the first persisted row, never
/// from live selection state. Empty for an empty thread.
pub fn thread_document_ids(messages: &[ChatMessage]) -> Vec<i64> {
    messages
        .first()
        .map(|message| message.document_ids.clone())
        .unwrap_or_default()
}

/// Folds an owner's full message set into per-session summaries, newest
/// activity first.
///
/// This is a client-side fold over every fetched row, linear in the total
/// message count, not a store-side aggregation.
pub fn summarize(messages: Vec<ChatMessage>) -> Vec<ChatSummary> {
    let mut ordered = messages;
    sort_thread(&mut ordered);

    let mut by_chat: HashMap<Uuid, ChatSummary> = HashMap::new();
    for message in ordered {
        match by_chat.entry(message.chat_id) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(ChatSummary {
                    chat_id: message.chat_id,
                    // first row in creation order carries the session's set
                    document_ids: message.document_ids,
                    last_message: message.text,
                    last_sender: message.sender,
                    last_at: message.created_at,
                    message_count: 1,
                });
            }
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                let summary = slot.get_mut();
                summary.last_message = message.text;
                summary.last_sender = message.sender;
                summary.last_at = message.created_at;
                summary.message_count += 1;
            }
        }
    }

    let mut summaries: Vec<ChatSummary> = by_chat.into_values().collect();
    summaries.sort_by(|a, b| b.last_at.cmp(&a.last_at));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(
        id: i64,
        chat_id: Uuid,
        seconds: i64,
        sender: Sender,
        text: &str,
        document_ids: Vec<i64>,
    ) -> ChatMessage {
        ChatMessage {
            id,
            chat_id,
            owner_email: "owner@example.com".to_string(),
            sender,
            text: text.to_string(),
            document_ids,
            created_at: Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap(),
        }
    }

    #[test]
    fn sort_restores_creation_order_regardless_of_insertion_order() {
        let chat = Uuid::new_v4();
        let mut rows = vec![
            message(3, chat, 30, Sender::User, "third", vec![1]),
            message(1, chat, 10, Sender::User, "first", vec![1]),
            message(2, chat, 20, Sender::Ai, "second", vec![1]),
        ];
        sort_thread(&mut rows);

        let texts: Vec<&str> = rows.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn sort_breaks_equal_timestamps_by_row_id() {
        let chat = Uuid::new_v4();
        let mut rows = vec![
            message(8, chat, 5, Sender::Ai, "reply", vec![2]),
            message(7, chat, 5, Sender::User, "question", vec![2]),
        ];
        sort_thread(&mut rows);

        assert_eq!(rows[0].text, "question");
        assert_eq!(rows[1].text, "reply");
    }

    #[test]
    fn document_ids_come_from_the_first_row() {
        let chat = Uuid::new_v4();
        let mut rows = vec![
            message(2, chat, 20, Sender::Ai, "later", vec![9, 9, 9]),
            message(1, chat, 10, Sender::User, "opening", vec![4, 5]),
        ];
        sort_thread(&mut rows);

        assert_eq!(thread_document_ids(&rows), vec![4, 5]);
        assert!(thread_document_ids(&[]).is_empty());
    }

    #[test]
    fn summarize_folds_per_session_with_counts_and_last_message() {
        let older = Uuid::new_v4();
        let newer = Uuid::new_v4();
        let rows = vec![
            message(1, older, 10, Sender::User, "hi", vec![1]),
            message(2, older, 20, Sender::Ai, "hello", vec![1]),
            message(3, newer, 40, Sender::User, "ping", vec![2, 3]),
            message(4, older, 30, Sender::Ai, "still here", vec![1]),
            message(5, newer, 50, Sender::Ai, "pong", vec![2, 3]),
        ];

        let summaries = summarize(rows);
        assert_eq!(summaries.len(), 2);

        // newest activity first
        assert_eq!(summaries[0].chat_id, newer);
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[0].last_message, "pong");
        assert_eq!(summaries[0].last_sender, Sender::Ai);
        assert_eq!(summaries[0].document_ids, vec![2, 3]);

        assert_eq!(summaries[1].chat_id, older);
        assert_eq!(summaries[1].message_count, 3);
        assert_eq!(summaries[1].last_message, "still here");
    }

    #[test]
    fn summarize_of_nothing_is_empty() {
        assert!(summarize(Vec::new()).is_empty());
    }
}
