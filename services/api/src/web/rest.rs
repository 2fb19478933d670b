//! services/api/src/web/rest.rs
//!
//! Assembles the REST API: the router over the endpoint modules, the
//! service-level routes (health check, JSON 404 fallback), and the master
//! definition for the OpenAPI specification.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{auth, chat, documents, middleware::require_auth, state::AppState};

/// Upper bound on request bodies, which in practice bounds PDF uploads.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        documents::upload_document_handler,
        documents::list_documents_handler,
        documents::get_document_handler,
        documents::update_document_handler,
        documents::delete_document_handler,
        documents::document_messages_handler,
        chat::send_message_handler,
        chat::list_chats_handler,
        chat::get_chat_handler,
    ),
    components(schemas(
        HealthResponse,
        auth::SignupRequest,
        auth::LoginRequest,
        auth::AuthResponse,
        documents::DocumentResponse,
        documents::DocumentListItem,
        documents::DocumentListResponse,
        documents::UpdateDocumentRequest,
        documents::CachedMessageView,
        chat::SendMessageRequest,
        chat::SendMessageResponse,
        chat::ChatMessageView,
        chat::ChatSummaryView,
        chat::ChatThreadResponse,
    )),
    tags(
        (name = "docchat API", description = "API endpoints for uploading PDFs and chatting about them.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router Assembly
//=========================================================================================

/// Builds the application router over the shared state.
///
/// Health and the auth entry points are public; everything else sits behind
/// the session-cookie middleware. Unknown paths get a JSON 404.
pub fn app_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/documents",
            post(documents::upload_document_handler).get(documents::list_documents_handler),
        )
        .route(
            "/documents/{id}",
            get(documents::get_document_handler)
                .patch(documents::update_document_handler)
                .delete(documents::delete_document_handler),
        )
        .route(
            "/documents/{id}/messages",
            get(documents::document_messages_handler),
        )
        .route("/chats", get(chat::list_chats_handler))
        .route("/chats/messages", post(chat::send_message_handler))
        .route("/chats/{chat_id}", get(chat::get_chat_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

//=========================================================================================
// Service-level Handlers
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health - Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
