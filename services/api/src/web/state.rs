//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use docchat_core::cache::ChatCache;
use docchat_core::ports::{AuthStore, ChatLogStore, DocumentStore, InferenceService};
use std::sync::Arc;
use tokio::sync::RwLock;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// The chat cache holds per-document message buffers for the lifetime of the
/// process. The stores stay authoritative; the cache is never written back
/// to them. Lock scopes around the cache must not span a store or webhook
/// await.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<dyn DocumentStore>,
    pub chat_log: Arc<dyn ChatLogStore>,
    pub auth: Arc<dyn AuthStore>,
    pub inference: Arc<dyn InferenceService>,
    pub chat_cache: Arc<RwLock<ChatCache>>,
    pub config: Arc<Config>,
}
