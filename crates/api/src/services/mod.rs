//! External service integrations.

pub mod fcm;
pub mod stream_chat;

pub use fcm::{FcmPushService, LoggingPushService};
pub use stream_chat::StreamChatClient;
