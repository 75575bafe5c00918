//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, money, time, errors, state machine)
//! - `membership` - Subscription lifecycle and capability rules
//! - `order` - Orders, receipt summaries and refund events
//! - `gateway` - Payment gateway results and inbound notifications
//! - `events` - The event type delivered to sinks

pub mod events;
pub mod foundation;
pub mod gateway;
pub mod membership;
pub mod order;

pub use events::{DomainEvent, EventEnvelope};
