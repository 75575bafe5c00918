//! In-process implementations of the storage and directory ports.
//!
//! Each store guards its state with a `tokio::sync::RwLock`, which gives the
//! same atomicity the Postgres adapters get from constraints and
//! conditional updates.

mod capability_grantor;
mod directory;
mod membership_repository;
mod notification_log;
mod order_repository;
mod processed_event_store;

pub use capability_grantor::InMemoryCapabilityGrantor;
pub use directory::{InMemoryLevelCatalog, InMemoryUserDirectory};
pub use membership_repository::InMemoryMembershipRepository;
pub use notification_log::InMemoryNotificationLog;
pub use order_repository::InMemoryOrderRepository;
pub use processed_event_store::InMemoryProcessedEventStore;
