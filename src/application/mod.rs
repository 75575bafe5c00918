//! Application layer - services driving the membership engine.
//!
//! Each service takes its collaborators as `Arc<dyn Port>` at construction,
//! so the same code runs against Postgres in production and against the
//! in-memory adapters in tests.

pub mod handlers;

pub use handlers::{
    AssignOptions, DailySweep, IdempotencyService, MembershipLifecycle, OrderReconciliation,
    ReconciliationError, ReconciliationSettings, RefundOutcome, SweepReport, WebhookAck,
    WebhookError, WebhookProcessor,
};
