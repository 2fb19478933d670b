//! crates/docchat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored record describing one uploaded PDF and its extracted metadata.
///
/// A document is visible only to queries scoped to its `owner_email`;
/// there is no sharing.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: i64,
    pub owner_email: String,
    pub name: String,
    pub summary: String,
    pub page_count: u32,
    pub word_count: u32,
    pub language: String,
    pub extracted_text: String,
    pub created_at: DateTime<Utc>,
}

/// Metadata the inference webhook extracted from one uploaded file.
///
/// Fields the webhook omits fall back to the defaults produced by
/// [`DocumentAnalysis::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAnalysis {
    pub summary: String,
    pub page_count: u32,
    pub word_count: u32,
    pub language: String,
    pub extracted_text: String,
}

impl Default for DocumentAnalysis {
    fn default() -> Self {
        Self {
            summary: String::new(),
            page_count: 0,
            word_count: 0,
            language: "Unknown".to_string(),
            extracted_text: String::new(),
        }
    }
}

/// A partial update to a stored document. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    pub name: Option<String>,
    pub summary: Option<String>,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }

    /// Parses the stored representation; `None` for anything unexpected.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Sender::User),
            "ai" => Some(Sender::Ai),
            _ => None,
        }
    }
}

/// One persisted chat-log row.
///
/// A chat session has no row of its own: it exists as the set of messages
/// sharing a `chat_id`, scoped to one owner. The session's document ids are
/// denormalized onto every row so each row is self-describing.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: Uuid,
    pub owner_email: String,
    pub sender: Sender,
    pub text: String,
    pub document_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

/// Payload for appending one row to the chat log. The row id and timestamp
/// are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub chat_id: Uuid,
    pub owner_email: String,
    pub sender: Sender,
    pub text: String,
    pub document_ids: Vec<i64>,
}

// Represents an account - email is the scoping key for everything the user
// owns.
#[derive(Debug, Clone)]
pub struct User {
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub email: String,
    pub hashed_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_round_trips_through_stored_form() {
        assert_eq!(Sender::parse(Sender::User.as_str()), Some(Sender::User));
        assert_eq!(Sender::parse(Sender::Ai.as_str()), Some(Sender::Ai));
        assert_eq!(Sender::parse("assistant"), None);
    }

    #[test]
    fn analysis_defaults_match_missing_webhook_fields() {
        let analysis = DocumentAnalysis::default();
        assert_eq!(analysis.summary, "");
        assert_eq!(analysis.page_count, 0);
        assert_eq!(analysis.word_count, 0);
        assert_eq!(analysis.language, "Unknown");
        assert_eq!(analysis.extracted_text, "");
    }
}
