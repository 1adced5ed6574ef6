//! Group and group member repository.

use chrono::{DateTime, Utc};
use domain::models::{Group, GroupMember};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::{GroupEntity, GroupMemberEntity};
use crate::metrics::QueryTimer;

/// Repository for groups and their rosters.
pub struct GroupRepository;

impl GroupRepository {
    pub async fn insert_group(conn: &mut PgConnection, group: &Group) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_group");
        let result = sqlx::query(
            r#"
            INSERT INTO groups (id, hotplace_id, latitude, longitude, title, introduction,
                                meetup_starts_at, meetup_ends_at, match_cost, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(group.id)
        .bind(group.hotplace_id)
        .bind(group.location.latitude)
        .bind(group.location.longitude)
        .bind(&group.title)
        .bind(&group.introduction)
        .bind(group.meetup_starts_at)
        .bind(group.meetup_ends_at)
        .bind(group.match_cost)
        .bind(group.is_active)
        .bind(group.created_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Find a group by ID, active or not.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_by_id");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, hotplace_id, latitude, longitude, title, introduction,
                   meetup_starts_at, meetup_ends_at, match_cost, is_active, created_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_group_by_id");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, hotplace_id, latitude, longitude, title, introduction,
                   meetup_starts_at, meetup_ends_at, match_cost, is_active, created_at
            FROM groups
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

    pub async fn deactivate(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("deactivate_group");
        let result = sqlx::query("UPDATE groups SET is_active = false WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await;
        timer.record();
        result.map(|_| ())
    }

    /// Active groups in a hotplace, newest first.
    pub async fn list_active_in_hotplace(
        conn: &mut PgConnection,
        hotplace_id: i64,
    ) -> Result<Vec<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_groups_in_hotplace");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, hotplace_id, latitude, longitude, title, introduction,
                   meetup_starts_at, meetup_ends_at, match_cost, is_active, created_at
            FROM groups
            WHERE hotplace_id = $1 AND is_active = true
            ORDER BY created_at DESC
            "#,
        )
        .bind(hotplace_id)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn insert_member(
        conn: &mut PgConnection,
        member: &GroupMember,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_group_member");
        let result = sqlx::query(
            r#"
            INSERT INTO group_members (id, group_id, user_id, is_leader, is_active, joined_at, left_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(member.id)
        .bind(member.group_id)
        .bind(member.user_id)
        .bind(member.is_leader)
        .bind(member.is_active)
        .bind(member.joined_at)
        .bind(member.left_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn find_active_membership(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Option<GroupMemberEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_membership");
        let result = sqlx::query_as::<_, GroupMemberEntity>(
            r#"
            SELECT id, group_id, user_id, is_leader, is_active, joined_at, left_at
            FROM group_members
            WHERE user_id = $1 AND is_active = true
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    /// Active roster ordered by join time.
    pub async fn list_active_members(
        conn: &mut PgConnection,
        group_id: Uuid,
    ) -> Result<Vec<GroupMemberEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_members");
        let result = sqlx::query_as::<_, GroupMemberEntity>(
            r#"
            SELECT id, group_id, user_id, is_leader, is_active, joined_at, left_at
            FROM group_members
            WHERE group_id = $1 AND is_active = true
            ORDER BY joined_at, id
            "#,
        )
        .bind(group_id)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn deactivate_member(
        conn: &mut PgConnection,
        member_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("deactivate_group_member");
        let result = sqlx::query(
            "UPDATE group_members SET is_active = false, left_at = $2 WHERE id = $1 AND is_active = true",
        )
        .bind(member_id)
        .bind(at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn deactivate_members_of_group(
        conn: &mut PgConnection,
        group_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_members_of_group");
        let result = sqlx::query(
            "UPDATE group_members SET is_active = false, left_at = $2 WHERE group_id = $1 AND is_active = true",
        )
        .bind(group_id)
        .bind(at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }
}
