//! PostgreSQL implementation of CapabilityGrantor.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::membership::{Capability, CapabilitySet};
use crate::ports::CapabilityGrantor;

use super::db_error;

/// Grants live in `member_capabilities`, one row per (user, tag).
pub struct PostgresCapabilityGrantor {
    pool: PgPool,
}

impl PostgresCapabilityGrantor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CapabilityGrantor for PostgresCapabilityGrantor {
    async fn granted(&self, user_id: &UserId) -> Result<CapabilitySet, DomainError> {
        let tags: Vec<String> =
            sqlx::query_scalar("SELECT capability FROM member_capabilities WHERE user_id = $1")
                .bind(user_id.as_i64())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load capabilities", e))?;

        Ok(tags.into_iter().map(Capability::from_stored).collect())
    }

    async fn grant(&self, user_id: &UserId, capability: &Capability) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO member_capabilities (user_id, capability)
            VALUES ($1, $2)
            ON CONFLICT (user_id, capability) DO NOTHING
            "#,
        )
        .bind(user_id.as_i64())
        .bind(capability.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to grant capability", e))?;

        Ok(())
    }

    async fn revoke(&self, user_id: &UserId, capability: &Capability) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM member_capabilities WHERE user_id = $1 AND capability = $2")
            .bind(user_id.as_i64())
            .bind(capability.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to revoke capability", e))?;

        Ok(())
    }
}
