//! Business logic services for the match lifecycle.

pub mod chat;
pub mod chat_broker;
pub mod deletion;
pub mod groups;
pub mod hotplace_index;
pub mod identity;
pub mod ledger;
pub mod matching;
pub mod memory_store;
pub mod notification;
pub mod purchases;

pub use chat::{ChatClientError, ChatProvider, MockChatProvider};
pub use chat_broker::{ChatBroker, ReconcileReport, WebhookOutcome};
pub use deletion::DeletionService;
pub use groups::GroupRegistry;
pub use identity::IdentityService;
pub use ledger::LedgerService;
pub use matching::MatchCoordinator;
pub use memory_store::InMemoryStore;
pub use notification::{
    DispatchMode, MatchNotification, MockPushService, NotificationDispatcher, PushService,
};
pub use purchases::PurchaseApplier;
