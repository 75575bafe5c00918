//! Application handlers.
//!
//! Services that orchestrate domain operations over the ports.

pub mod membership;
pub mod order;
pub mod webhook;

pub use membership::{AssignOptions, DailySweep, MembershipLifecycle, SweepReport};
pub use order::{OrderReconciliation, ReconciliationError, ReconciliationSettings, RefundOutcome};
pub use webhook::{IdempotencyService, WebhookAck, WebhookError, WebhookProcessor};
