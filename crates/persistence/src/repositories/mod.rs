//! Repository implementations for database access.
//!
//! Repositories are stateless; every query runs on the connection it is
//! handed, which is normally the open transaction of a [`crate::store::PgStoreTx`].

pub mod chat;
pub mod deletion;
pub mod group;
pub mod hotplace;
pub mod invitation;
pub mod match_request;
pub mod point;
pub mod purchase;
pub mod user;

pub use chat::ChatBindingRepository;
pub use deletion::DeletionRepository;
pub use group::GroupRepository;
pub use hotplace::HotplaceRepository;
pub use invitation::InvitationRepository;
pub use match_request::MatchRequestRepository;
pub use point::PointRepository;
pub use purchase::PurchaseRepository;
pub use user::UserRepository;
