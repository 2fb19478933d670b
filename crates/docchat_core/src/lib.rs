pub mod cache;
pub mod domain;
pub mod history;
pub mod ports;

pub use cache::{CachedMessage, ChatCache};
pub use domain::{ChatMessage, Document, DocumentAnalysis, DocumentUpdate, NewChatMessage, Sender,
    User, UserCredentials};
pub use history::{ChatSummary, sort_thread, summarize, thread_document_ids};
pub use ports::{AuthStore, ChatLogStore, DocumentStore, InferenceService, PortError, PortResult};
