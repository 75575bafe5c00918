//! PostgreSQL implementation of NotificationLog.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, MembershipId, Timestamp, UserId};
use crate::ports::{NotificationKind, NotificationLog};

use super::db_error;

pub struct PostgresNotificationLog {
    pool: PgPool,
}

impl PostgresNotificationLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLog for PostgresNotificationLog {
    async fn was_notified(
        &self,
        user_id: &UserId,
        membership_id: &MembershipId,
        kind: NotificationKind,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM membership_notifications
                WHERE user_id = $1 AND membership_id = $2 AND kind = $3
            )
            "#,
        )
        .bind(user_id.as_i64())
        .bind(membership_id.as_i64())
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check notification marker", e))
    }

    async fn mark_notified(
        &self,
        user_id: &UserId,
        membership_id: &MembershipId,
        kind: NotificationKind,
        at: &Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO membership_notifications (user_id, membership_id, kind, notified_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, membership_id, kind) DO NOTHING
            "#,
        )
        .bind(user_id.as_i64())
        .bind(membership_id.as_i64())
        .bind(kind.as_str())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record notification marker", e))?;

        Ok(())
    }
}
