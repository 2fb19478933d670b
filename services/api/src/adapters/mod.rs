pub mod db;
pub mod webhook;

pub use db::DbAdapter;
pub use webhook::WebhookAdapter;
