//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod chat;
pub mod deletion;
pub mod group;
pub mod hotplace;
pub mod invitation;
pub mod match_request;
pub mod point;
pub mod purchase;
pub mod user;

pub use chat::{ChatChannelBindingEntity, OrphanChannelEntity};
pub use deletion::{DeletionScheduleEntity, DeletionStatusDb};
pub use group::{GroupEntity, GroupMemberEntity};
pub use hotplace::HotplaceEntity;
pub use invitation::InvitationCodeEntity;
pub use match_request::{MatchRequestEntity, MatchStatusDb};
pub use point::{LedgerEntryKindDb, PointConsumptionEntity, PointReasonDb};
pub use purchase::{PurchasePlatformDb, PurchaseRecordEntity};
pub use user::UserEntity;
