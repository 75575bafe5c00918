//! PostgreSQL adapters - sqlx implementations of the storage ports.
//!
//! - `PostgresMembershipRepository` - membership rows with version checks
//! - `PostgresOrderRepository` - orders and atomic note appends
//! - `PostgresProcessedEventStore` - webhook idempotency records
//! - `PostgresCapabilityGrantor` - engine-managed capability tags
//! - `PostgresLevelCatalog` / `PostgresUserDirectory` - display lookups
//! - `PostgresNotificationLog` - sweep notification markers

mod capability_grantor;
mod directory;
mod membership_repository;
mod notification_log;
mod order_repository;
mod processed_event_store;

pub use capability_grantor::PostgresCapabilityGrantor;
pub use directory::{PostgresLevelCatalog, PostgresUserDirectory};
pub use membership_repository::PostgresMembershipRepository;
pub use notification_log::PostgresNotificationLog;
pub use order_repository::PostgresOrderRepository;
pub use processed_event_store::PostgresProcessedEventStore;

use std::fmt::Display;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Opens the pool and, when configured, applies the embedded migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| db_error("Failed to connect to database", e))?;

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to run migrations: {}", e)))?;
        tracing::info!("Database migrations applied");
    }
    Ok(pool)
}

fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err))
}

/// A stored value that no longer decodes into the domain type.
fn decode_error(field: &str, err: impl Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} in database: {}", field, err),
    )
    .with_detail("field", field)
}

fn non_negative(field: &str, value: i32) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| decode_error(field, format!("negative value {}", value)))
}
