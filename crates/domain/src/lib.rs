//! Domain layer for the Hotplace Meetup backend.
//!
//! This crate contains:
//! - Domain models (User, Group, MatchRequest, ChatChannelBinding, ...)
//! - The storage seam ([`store::MeetupStore`]) and an in-memory implementation
//! - Business logic services for the match lifecycle
//! - Domain error types

pub mod engine;
pub mod errors;
pub mod models;
pub mod services;
pub mod settings;
pub mod store;

pub use engine::MeetupCore;
pub use errors::{DomainError, DomainResult, ErrorKind};
pub use settings::{CoreSettings, FreePassPolicy};
pub use store::{MeetupStore, StoreError, StoreTx};
