//! Domain models for the meetup backend.

pub mod chat;
pub mod deletion;
pub mod group;
pub mod hotplace;
pub mod invitation;
pub mod match_request;
pub mod point;
pub mod purchase;
pub mod user;

pub use chat::{ChannelHandle, ChatChannelBinding, OrphanChannel};
pub use deletion::{DeletionSchedule, DeletionStatus};
pub use group::{Group, GroupDetail, GroupMember, GroupProfile};
pub use hotplace::{GeoPoint, Hotplace};
pub use invitation::InvitationCode;
pub use match_request::{MatchRequest, MatchStatus};
pub use point::{PointConsumption, PointReason};
pub use purchase::{ProductCatalog, ProductGrant, ValidatedPurchase};
pub use user::User;
