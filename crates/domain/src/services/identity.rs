//! User identities.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{DomainError, DomainResult};
use crate::models::point::PointReason;
use crate::models::user::{RegisterUserRequest, RegisteredUser, User};
use crate::services::ledger;
use crate::settings::CoreSettings;
use crate::store::{MeetupStore, StoreTx};

/// Idempotency key of the one-off registration credit.
pub fn signup_bonus_key(user_id: Uuid) -> String {
    format!("signup:{}", user_id)
}

#[derive(Clone)]
pub struct IdentityService<S: MeetupStore> {
    store: S,
    settings: Arc<CoreSettings>,
}

impl<S: MeetupStore> IdentityService<S> {
    pub fn new(store: S, settings: Arc<CoreSettings>) -> Self {
        Self { store, settings }
    }

    /// Registers a phone-verified user, or returns the existing identity for
    /// that number.
    pub async fn register_user(&self, request: RegisterUserRequest) -> DomainResult<RegisteredUser> {
        request.validate()?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        if let Some(user) = tx.find_user_by_phone(&request.phone_number).await? {
            return Ok(RegisteredUser {
                user,
                created: false,
            });
        }

        let user = User {
            id: Uuid::new_v4(),
            phone_number: request.phone_number.clone(),
            point_balance: 0,
            free_pass_until: None,
            is_deleted: false,
            created_at: now,
            deleted_at: None,
        };
        if let Err(e) = tx.insert_user(&user).await {
            let e = DomainError::from(e);
            if !e.is_unique_violation() {
                return Err(e);
            }
            drop(tx);
            return self.reread_registration(&request.phone_number).await;
        }

        if self.settings.initial_points > 0 {
            ledger::credit(
                &mut tx,
                user.id,
                self.settings.initial_points,
                PointReason::SignupBonus,
                &signup_bonus_key(user.id),
                now,
            )
            .await?;
        }

        if let Err(e) = tx.commit().await {
            let e = DomainError::from(e);
            if !e.is_unique_violation() {
                return Err(e);
            }
            return self.reread_registration(&request.phone_number).await;
        }

        info!(user_id = %user.id, "User registered");
        let user = self.get_user(user.id).await?;
        Ok(RegisteredUser {
            user,
            created: true,
        })
    }

    /// A concurrent registration for the same number committed first.
    async fn reread_registration(&self, phone_number: &str) -> DomainResult<RegisteredUser> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user_by_phone(phone_number)
            .await?
            .ok_or_else(|| DomainError::Conflict("User registration raced".into()))?;
        Ok(RegisteredUser {
            user,
            created: false,
        })
    }

    pub async fn get_user(&self, user_id: Uuid) -> DomainResult<User> {
        let mut tx = self.store.begin().await?;
        tx.find_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))
    }
}
