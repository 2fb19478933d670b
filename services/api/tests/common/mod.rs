//! Shared test support: in-memory implementations of the store ports, a
//! programmable inference stub, and helpers to assemble the router and
//! build requests against it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use api_lib::config::Config;
use api_lib::web::{app_router, state::AppState};
use docchat_core::cache::ChatCache;
use docchat_core::domain::{
    ChatMessage, Document, DocumentAnalysis, DocumentUpdate, NewChatMessage, User, UserCredentials,
};
use docchat_core::history::sort_thread;
use docchat_core::ports::{
    AuthStore, ChatLogStore, DocumentStore, InferenceService, PortError, PortResult,
};

//=========================================================================================
// In-memory Store
//=========================================================================================

/// One in-memory backend standing in for all three store ports, mirroring
/// the SQL adapter's semantics: owner scoping, assigned ids, and creation
/// ordering.
pub struct InMemoryStore {
    next_document_id: AtomicI64,
    next_message_id: AtomicI64,
    pub documents: Mutex<Vec<Document>>,
    pub messages: Mutex<Vec<ChatMessage>>,
    pub users: Mutex<HashMap<String, String>>,
    pub sessions: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_document_id: AtomicI64::new(1),
            next_message_id: AtomicI64::new(1),
            documents: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            users: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_document(
        &self,
        owner_email: &str,
        name: &str,
        analysis: &DocumentAnalysis,
    ) -> PortResult<Document> {
        let id = self.next_document_id.fetch_add(1, Ordering::SeqCst);
        let document = Document {
            id,
            owner_email: owner_email.to_string(),
            name: name.to_string(),
            summary: analysis.summary.clone(),
            page_count: analysis.page_count,
            word_count: analysis.word_count,
            language: analysis.language.clone(),
            extracted_text: analysis.extracted_text.clone(),
            created_at: Utc::now(),
        };
        self.documents.lock().await.push(document.clone());
        Ok(document)
    }

    async fn documents_for_owner(&self, owner_email: &str) -> PortResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .documents
            .lock()
            .await
            .iter()
            .filter(|d| d.owner_email == owner_email)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(documents)
    }

    async fn document_by_id(&self, owner_email: &str, id: i64) -> PortResult<Option<Document>> {
        Ok(self
            .documents
            .lock()
            .await
            .iter()
            .find(|d| d.owner_email == owner_email && d.id == id)
            .cloned())
    }

    async fn update_document(
        &self,
        owner_email: &str,
        id: i64,
        update: &DocumentUpdate,
    ) -> PortResult<Document> {
        let mut documents = self.documents.lock().await;
        let document = documents
            .iter_mut()
            .find(|d| d.owner_email == owner_email && d.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", id)))?;
        if let Some(name) = &update.name {
            document.name = name.clone();
        }
        if let Some(summary) = &update.summary {
            document.summary = summary.clone();
        }
        Ok(document.clone())
    }

    async fn delete_document(&self, owner_email: &str, id: i64) -> PortResult<()> {
        let mut documents = self.documents.lock().await;
        let before = documents.len();
        documents.retain(|d| !(d.owner_email == owner_email && d.id == id));
        if documents.len() == before {
            return Err(PortError::NotFound(format!("Document {} not found", id)));
        }
        Ok(())
    }

    async fn count_for_owner(&self, owner_email: &str) -> PortResult<u64> {
        Ok(self
            .documents
            .lock()
            .await
            .iter()
            .filter(|d| d.owner_email == owner_email)
            .count() as u64)
    }
}

#[async_trait]
impl ChatLogStore for InMemoryStore {
    async fn append_message(&self, message: NewChatMessage) -> PortResult<ChatMessage> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        let row = ChatMessage {
            id,
            chat_id: message.chat_id,
            owner_email: message.owner_email,
            sender: message.sender,
            text: message.text,
            document_ids: message.document_ids,
            created_at: Utc::now(),
        };
        self.messages.lock().await.push(row.clone());
        Ok(row)
    }

    async fn thread(&self, owner_email: &str, chat_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        let mut rows: Vec<ChatMessage> = self
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| m.owner_email == owner_email && m.chat_id == chat_id)
            .cloned()
            .collect();
        sort_thread(&mut rows);
        Ok(rows)
    }

    async fn messages_for_owner(&self, owner_email: &str) -> PortResult<Vec<ChatMessage>> {
        let mut rows: Vec<ChatMessage> = self
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| m.owner_email == owner_email)
            .cloned()
            .collect();
        sort_thread(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut users = self.users.lock().await;
        if users.contains_key(email) {
            return Err(PortError::Store(format!("user {} already exists", email)));
        }
        users.insert(email.to_string(), hashed_password.to_string());
        Ok(User {
            email: email.to_string(),
        })
    }

    async fn user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.users
            .lock()
            .await
            .get(email)
            .map(|hash| UserCredentials {
                email: email.to_string(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.sessions
            .lock()
            .await
            .insert(session_id.to_string(), (email.to_string(), expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<String> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(email, _)| email.clone())
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.lock().await.remove(session_id);
        Ok(())
    }
}

//=========================================================================================
// Inference Stub
//=========================================================================================

pub enum AnalysisBehavior {
    Succeed(DocumentAnalysis),
    Incomplete,
    Fail(String),
}

pub enum AnswerBehavior {
    Succeed(String),
    Fail(String),
}

/// A programmable stand-in for the inference webhook. Records every call it
/// receives so tests can assert the webhook was (or was not) reached.
pub struct StubInference {
    analysis_behavior: AnalysisBehavior,
    answer_behavior: AnswerBehavior,
    pub analysis_calls: Mutex<Vec<(String, String)>>,
    pub answer_calls: Mutex<Vec<(String, Vec<i64>, String)>>,
}

impl StubInference {
    fn with_behaviors(analysis: AnalysisBehavior, answer: AnswerBehavior) -> Self {
        Self {
            analysis_behavior: analysis,
            answer_behavior: answer,
            analysis_calls: Mutex::new(Vec::new()),
            answer_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::with_behaviors(
            AnalysisBehavior::Succeed(DocumentAnalysis::default()),
            AnswerBehavior::Succeed("stub answer".to_string()),
        )
    }

    pub fn analyzing(analysis: DocumentAnalysis) -> Self {
        Self::with_behaviors(
            AnalysisBehavior::Succeed(analysis),
            AnswerBehavior::Succeed("stub answer".to_string()),
        )
    }

    pub fn incomplete_analysis() -> Self {
        Self::with_behaviors(
            AnalysisBehavior::Incomplete,
            AnswerBehavior::Succeed("stub answer".to_string()),
        )
    }

    pub fn failing_analysis(message: &str) -> Self {
        Self::with_behaviors(
            AnalysisBehavior::Fail(message.to_string()),
            AnswerBehavior::Succeed("stub answer".to_string()),
        )
    }

    pub fn answering(text: &str) -> Self {
        Self::with_behaviors(
            AnalysisBehavior::Succeed(DocumentAnalysis::default()),
            AnswerBehavior::Succeed(text.to_string()),
        )
    }

    pub fn failing_answers(message: &str) -> Self {
        Self::with_behaviors(
            AnalysisBehavior::Succeed(DocumentAnalysis::default()),
            AnswerBehavior::Fail(message.to_string()),
        )
    }
}

#[async_trait]
impl InferenceService for StubInference {
    async fn analyze_document(
        &self,
        file_name: &str,
        _pdf: &[u8],
        owner_email: &str,
    ) -> PortResult<DocumentAnalysis> {
        self.analysis_calls
            .lock()
            .await
            .push((file_name.to_string(), owner_email.to_string()));
        match &self.analysis_behavior {
            AnalysisBehavior::Succeed(analysis) => Ok(analysis.clone()),
            AnalysisBehavior::Incomplete => Err(PortError::IncompleteAnalysis),
            AnalysisBehavior::Fail(message) => Err(PortError::Webhook(message.clone())),
        }
    }

    async fn answer(
        &self,
        message: &str,
        document_ids: &[i64],
        owner_email: &str,
    ) -> PortResult<String> {
        self.answer_calls.lock().await.push((
            message.to_string(),
            document_ids.to_vec(),
            owner_email.to_string(),
        ));
        match &self.answer_behavior {
            AnswerBehavior::Succeed(text) => Ok(text.clone()),
            AnswerBehavior::Fail(message) => Err(PortError::Webhook(message.clone())),
        }
    }
}

//=========================================================================================
// App Assembly and Request Helpers
//=========================================================================================

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        webhook_url: "http://webhook.invalid".to_string(),
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:3000".to_string(),
    }
}

/// Builds the full router over in-memory fakes. Returns the store and the
/// inference stub too so tests can seed and inspect them directly.
pub fn test_app(inference: StubInference) -> (Router, Arc<InMemoryStore>, Arc<StubInference>) {
    let store = InMemoryStore::new();
    let inference = Arc::new(inference);
    let state = Arc::new(AppState {
        documents: store.clone(),
        chat_log: store.clone(),
        auth: store.clone(),
        inference: inference.clone(),
        chat_cache: Arc::new(RwLock::new(ChatCache::new())),
        config: Arc::new(test_config()),
    });
    (app_router(state), store, inference)
}

/// Seeds a valid auth session and returns its cookie token.
pub async fn seed_session(store: &InMemoryStore, email: &str) -> String {
    let token = Uuid::new_v4().to_string();
    store.sessions.lock().await.insert(
        token.clone(),
        (email.to_string(), Utc::now() + Duration::days(1)),
    );
    token
}

/// Seeds one stored document and returns it.
pub async fn seed_document(store: &InMemoryStore, owner_email: &str, name: &str) -> Document {
    let analysis = DocumentAnalysis {
        summary: "seeded summary".to_string(),
        page_count: 1,
        word_count: 10,
        language: "English".to_string(),
        extracted_text: "seeded text".to_string(),
    };
    store
        .insert_document(owner_email, name, &analysis)
        .await
        .unwrap()
}

pub fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Cookie", format!("session={token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("Cookie", format!("session={token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Cookie", format!("session={token}"))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const MULTIPART_BOUNDARY: &str = "docchat-test-boundary";

/// Builds a multipart upload request with one `pdf` file part.
pub fn upload_request(
    token: &str,
    file_name: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"pdf\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/documents")
        .header("Cookie", format!("session={token}"))
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn response_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
