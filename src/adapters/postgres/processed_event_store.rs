//! PostgreSQL implementation of ProcessedEventStore.
//!
//! `event_id` is the primary key, so `insert_if_absent` is a single
//! `INSERT .. ON CONFLICT DO NOTHING` and concurrent deliveries of the same
//! event cannot both be recorded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::gateway::GatewayKind;
use crate::ports::{ProcessedEvent, ProcessedEventStore, SaveResult};

use super::db_error;

pub struct PostgresProcessedEventStore {
    pool: PgPool,
}

impl PostgresProcessedEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProcessedEventRow {
    event_id: String,
    gateway: String,
    metadata: sqlx::types::Json<Value>,
    processed_at: DateTime<Utc>,
}

impl From<ProcessedEventRow> for ProcessedEvent {
    fn from(row: ProcessedEventRow) -> Self {
        ProcessedEvent {
            event_id: row.event_id,
            gateway: GatewayKind::from(row.gateway),
            metadata: row.metadata.0,
            processed_at: Timestamp::from_datetime(row.processed_at),
        }
    }
}

#[async_trait]
impl ProcessedEventStore for PostgresProcessedEventStore {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM processed_events WHERE event_id = $1)")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check processed event", e))
    }

    async fn insert_if_absent(&self, event: ProcessedEvent) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, gateway, metadata, processed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&event.event_id)
        .bind(event.gateway.as_str())
        .bind(sqlx::types::Json(&event.metadata))
        .bind(event.processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record processed event", e))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }

    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError> {
        let row: Option<ProcessedEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, gateway, metadata, processed_at
            FROM processed_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find processed event", e))?;

        Ok(row.map(ProcessedEvent::from))
    }

    async fn delete_before(&self, cutoff: &Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM processed_events WHERE processed_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to clean up processed events", e))?;

        Ok(result.rows_affected())
    }
}
