//! User repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::User;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

/// Repository for user rows.
pub struct UserRepository;

impl UserRepository {
    /// Find a user by ID.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, phone_number, point_balance, free_pass_until, is_deleted, created_at, deleted_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    /// Find a user by ID and hold its row lock until the transaction ends.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, phone_number, point_balance, free_pass_until, is_deleted, created_at, deleted_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    /// Find a user by phone number.
    pub async fn find_by_phone(
        conn: &mut PgConnection,
        phone_number: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_phone");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, phone_number, point_balance, free_pass_until, is_deleted, created_at, deleted_at
            FROM users
            WHERE phone_number = $1
            "#,
        )
        .bind(phone_number)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn insert(conn: &mut PgConnection, user: &User) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_user");
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, phone_number, point_balance, free_pass_until, is_deleted, created_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.phone_number)
        .bind(user.point_balance)
        .bind(user.free_pass_until)
        .bind(user.is_deleted)
        .bind(user.created_at)
        .bind(user.deleted_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn update_balance(
        conn: &mut PgConnection,
        id: Uuid,
        balance: i64,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("update_user_balance");
        let result = sqlx::query("UPDATE users SET point_balance = $2 WHERE id = $1")
            .bind(id)
            .bind(balance)
            .execute(&mut *conn)
            .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn update_free_pass(
        conn: &mut PgConnection,
        id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("update_user_free_pass");
        let result = sqlx::query("UPDATE users SET free_pass_until = $2 WHERE id = $1")
            .bind(id)
            .bind(until)
            .execute(&mut *conn)
            .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn mark_deleted(
        conn: &mut PgConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("mark_user_deleted");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_deleted = true, deleted_at = $2, free_pass_until = NULL
            WHERE id = $1 AND is_deleted = false
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
