//! crates/docchat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete database and webhook adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ChatMessage, Document, DocumentAnalysis, DocumentUpdate, NewChatMessage, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// `Webhook` covers transport/HTTP failures talking to the inference
/// endpoint; `IncompleteAnalysis` is the distinct case where the endpoint
/// answered but returned no usable metadata.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("Inference webhook error: {0}")]
    Webhook(String),
    #[error("Analysis returned no usable metadata")]
    IncompleteAnalysis,
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The thin data-access surface over stored documents. Every operation is
/// scoped to an owner email; an id that exists under a different owner is
/// indistinguishable from one that does not exist.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists a newly analyzed upload and returns the stored row,
    /// including the store-assigned id.
    async fn insert_document(
        &self,
        owner_email: &str,
        name: &str,
        analysis: &DocumentAnalysis,
    ) -> PortResult<Document>;

    /// All of the owner's documents, newest first.
    async fn documents_for_owner(&self, owner_email: &str) -> PortResult<Vec<Document>>;

    /// One document by id, or `None` when absent for this owner.
    async fn document_by_id(&self, owner_email: &str, id: i64) -> PortResult<Option<Document>>;

    /// Applies a partial update and returns the updated row.
    async fn update_document(
        &self,
        owner_email: &str,
        id: i64,
        update: &DocumentUpdate,
    ) -> PortResult<Document>;

    async fn delete_document(&self, owner_email: &str, id: i64) -> PortResult<()>;

    async fn count_for_owner(&self, owner_email: &str) -> PortResult<u64>;
}

/// Append-only log of chat messages. Sessions are reconstructed from rows;
/// there is no session table.
#[async_trait]
pub trait ChatLogStore: Send + Sync {
    /// Appends one row and returns it with the store-assigned id and
    /// timestamp.
    async fn append_message(&self, message: NewChatMessage) -> PortResult<ChatMessage>;

    /// Every row of one session, ordered ascending by creation time (row id
    /// as tiebreak). Empty when the session does not exist for this owner.
    async fn thread(&self, owner_email: &str, chat_id: Uuid) -> PortResult<Vec<ChatMessage>>;

    /// The owner's full message set across all sessions, in creation order.
    /// The history view folds over this client-side.
    async fn messages_for_owner(&self, owner_email: &str) -> PortResult<Vec<ChatMessage>>;
}

/// The external inference webhook: OCR + summarization for uploads,
/// question answering for chat turns. Treated as an opaque black box.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Submits a document for analysis.
    ///
    /// Fails with [`PortError::Webhook`] on transport/HTTP errors and with
    /// [`PortError::IncompleteAnalysis`] when the endpoint accepted the file
    /// but returned no usable metadata.
    async fn analyze_document(
        &self,
        file_name: &str,
        pdf: &[u8],
        owner_email: &str,
    ) -> PortResult<DocumentAnalysis>;

    /// Asks a question about a set of documents and returns the answer text.
    ///
    /// An answer the endpoint returns in an unrecognized shape is normalized
    /// to a fixed fallback prompt, never an error; only transport/HTTP
    /// failures produce [`PortError::Webhook`].
    async fn answer(
        &self,
        message: &str,
        document_ids: &[i64],
        owner_email: &str,
    ) -> PortResult<String>;
}

/// Account and cookie-session storage backing the auth endpoints.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User>;

    async fn user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a session id to the owner email, or `Unauthorized` when the
    /// session is unknown or expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
