//! PostgreSQL level catalog and member directory.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, LevelId, UserId};
use crate::domain::membership::{Level, MemberIdentity};
use crate::ports::{LevelCatalog, UserDirectory};

use super::db_error;

pub struct PostgresLevelCatalog {
    pool: PgPool,
}

impl PostgresLevelCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LevelRow {
    name: String,
    custom_capabilities: Vec<String>,
}

#[async_trait]
impl LevelCatalog for PostgresLevelCatalog {
    async fn find_level(&self, id: &LevelId) -> Result<Option<Level>, DomainError> {
        let row: Option<LevelRow> = sqlx::query_as(
            "SELECT name, custom_capabilities FROM membership_levels WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find level", e))?;

        Ok(row.map(|row| {
            Level::new(*id, row.name)
                .with_custom_capabilities(row.custom_capabilities.iter().map(String::as_str))
        }))
    }
}

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    login: String,
    email: String,
    display_name: String,
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_user(&self, id: &UserId) -> Result<Option<MemberIdentity>, DomainError> {
        let row: Option<MemberRow> =
            sqlx::query_as("SELECT login, email, display_name FROM members WHERE user_id = $1")
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find member", e))?;

        Ok(row.map(|row| MemberIdentity {
            user_id: *id,
            login: row.login,
            email: row.email,
            display_name: row.display_name,
        }))
    }
}
