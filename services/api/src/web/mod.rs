pub mod auth;
pub mod chat;
pub mod documents;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the router assembly and auth middleware to make them easily
// accessible to the binary that starts the web server.
pub use middleware::require_auth;
pub use rest::{app_router, ApiDoc};
