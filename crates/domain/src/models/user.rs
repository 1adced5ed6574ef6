//! User identity domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A registered user identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: Uuid,
    pub phone_number: String,
    pub point_balance: i64,
    pub free_pass_until: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Returns true while the user's free pass has not run out.
    pub fn has_active_free_pass(&self, now: DateTime<Utc>) -> bool {
        self.free_pass_until.map(|until| now < until).unwrap_or(false)
    }
}

/// Request payload for registering a user after phone verification.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RegisterUserRequest {
    #[validate(custom(function = "shared::validation::validate_phone_number"))]
    pub phone_number: String,
}

/// Result of a registration call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RegisteredUser {
    pub user: User,
    /// False when the phone number was already registered.
    pub created: bool,
}
