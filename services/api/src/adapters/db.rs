//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the store ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docchat_core::domain::{
    ChatMessage, Document, DocumentAnalysis, DocumentUpdate, NewChatMessage, Sender, User,
    UserCredentials,
};
use docchat_core::ports::{AuthStore, ChatLogStore, DocumentStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore`, `ChatLogStore`,
/// and `AuthStore` ports on a shared connection pool.
///
/// Every query carries the owner email in its WHERE clause; an id that
/// exists under another owner behaves exactly like one that does not exist.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn store_err(e: sqlx::Error) -> PortError {
    PortError::Store(e.to_string())
}

/// Saturates a domain count onto the INTEGER column range. A plain `as`
/// cast would wrap values above `i32::MAX` into negatives.
fn to_db_count(value: u32) -> i32 {
    value.min(i32::MAX as u32) as i32
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRecord {
    id: i64,
    owner_email: String,
    name: String,
    summary: String,
    page_count: i32,
    word_count: i32,
    language: String,
    extracted_text: String,
    created_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            owner_email: self.owner_email,
            name: self.name,
            summary: self.summary,
            page_count: self.page_count.max(0) as u32,
            word_count: self.word_count.max(0) as u32,
            language: self.language,
            extracted_text: self.extracted_text,
            created_at: self.created_at,
        }
    }
}

const DOCUMENT_COLUMNS: &str =
    "id, owner_email, name, summary, page_count, word_count, language, extracted_text, created_at";

#[derive(FromRow)]
struct ChatMessageRecord {
    id: i64,
    chat_id: Uuid,
    owner_email: String,
    sender: String,
    message: String,
    pdf_ids: Vec<i64>,
    created_at: DateTime<Utc>,
}
impl ChatMessageRecord {
    fn to_domain(self) -> PortResult<ChatMessage> {
        let sender = Sender::parse(&self.sender).ok_or_else(|| {
            PortError::Store(format!(
                "chat message {} has unknown sender '{}'",
                self.id, self.sender
            ))
        })?;
        Ok(ChatMessage {
            id: self.id,
            chat_id: self.chat_id,
            owner_email: self.owner_email,
            sender,
            text: self.message,
            document_ids: self.pdf_ids,
            created_at: self.created_at,
        })
    }
}

const CHAT_MESSAGE_COLUMNS: &str = "id, chat_id, owner_email, sender, message, pdf_ids, created_at";

#[derive(FromRow)]
struct UserCredentialsRecord {
    email: String,
    hashed_password: String,
}
impl UserCredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn insert_document(
        &self,
        owner_email: &str,
        name: &str,
        analysis: &DocumentAnalysis,
    ) -> PortResult<Document> {
        let sql = format!(
            "INSERT INTO pdf_documents \
             (owner_email, name, summary, page_count, word_count, language, extracted_text) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {DOCUMENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(owner_email)
            .bind(name)
            .bind(&analysis.summary)
            .bind(to_db_count(analysis.page_count))
            .bind(to_db_count(analysis.word_count))
            .bind(&analysis.language)
            .bind(&analysis.extracted_text)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(record.to_domain())
    }

    async fn documents_for_owner(&self, owner_email: &str) -> PortResult<Vec<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM pdf_documents \
             WHERE owner_email = $1 ORDER BY created_at DESC, id DESC"
        );
        let records = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(owner_email)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn document_by_id(&self, owner_email: &str, id: i64) -> PortResult<Option<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM pdf_documents WHERE owner_email = $1 AND id = $2"
        );
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(owner_email)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn update_document(
        &self,
        owner_email: &str,
        id: i64,
        update: &DocumentUpdate,
    ) -> PortResult<Document> {
        let sql = format!(
            "UPDATE pdf_documents \
             SET name = COALESCE($3, name), summary = COALESCE($4, summary) \
             WHERE owner_email = $1 AND id = $2 RETURNING {DOCUMENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(owner_email)
            .bind(id)
            .bind(update.name.as_deref())
            .bind(update.summary.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        record
            .map(|r| r.to_domain())
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", id)))
    }

    async fn delete_document(&self, owner_email: &str, id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM pdf_documents WHERE owner_email = $1 AND id = $2")
            .bind(owner_email)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Document {} not found", id)));
        }
        Ok(())
    }

    async fn count_for_owner(&self, owner_email: &str) -> PortResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pdf_documents WHERE owner_email = $1")
                .bind(owner_email)
                .fetch_one(&self.pool)
                .await
                .map_err(store_err)?;
        Ok(count.max(0) as u64)
    }
}

//=========================================================================================
// `ChatLogStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatLogStore for DbAdapter {
    async fn append_message(&self, message: NewChatMessage) -> PortResult<ChatMessage> {
        let sql = format!(
            "INSERT INTO chat_messages (chat_id, owner_email, sender, message, pdf_ids) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CHAT_MESSAGE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ChatMessageRecord>(&sql)
            .bind(message.chat_id)
            .bind(&message.owner_email)
            .bind(message.sender.as_str())
            .bind(&message.text)
            .bind(&message.document_ids)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        record.to_domain()
    }

    async fn thread(&self, owner_email: &str, chat_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        let sql = format!(
            "SELECT {CHAT_MESSAGE_COLUMNS} FROM chat_messages \
             WHERE owner_email = $1 AND chat_id = $2 ORDER BY created_at ASC, id ASC"
        );
        let records = sqlx::query_as::<_, ChatMessageRecord>(&sql)
            .bind(owner_email)
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn messages_for_owner(&self, owner_email: &str) -> PortResult<Vec<ChatMessage>> {
        let sql = format!(
            "SELECT {CHAT_MESSAGE_COLUMNS} FROM chat_messages \
             WHERE owner_email = $1 ORDER BY created_at ASC, id ASC"
        );
        let records = sqlx::query_as::<_, ChatMessageRecord>(&sql)
            .bind(owner_email)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }
}

//=========================================================================================
// `AuthStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthStore for DbAdapter {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let created: String = sqlx::query_scalar(
            "INSERT INTO users (email, hashed_password) VALUES ($1, $2) RETURNING email",
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(User { email: created })
    }

    async fn user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserCredentialsRecord>(
            "SELECT email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        record
            .map(|r| r.to_domain())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, email, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(email)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        let email: Option<String> =
            sqlx::query_scalar("SELECT email FROM auth_sessions WHERE id = $1 AND expires_at > now()")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
        email.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}
