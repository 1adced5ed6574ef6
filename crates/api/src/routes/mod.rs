//! HTTP route handlers.

pub mod chat_webhooks;
pub mod health;
