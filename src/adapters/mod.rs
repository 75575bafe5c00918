//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `memory` - in-process stores for tests and local runs
//! - `events` - event sinks (in-memory bus, tracing)
//! - `postgres` - sqlx-backed storage
//! - `stripe` - payment gateway and webhook verification
//! - `email` - outgoing email delivery

pub mod email;
pub mod events;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use events::{InMemoryEventBus, TracingEventSink};
