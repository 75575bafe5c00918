//! Gateway webhook handling.
//!
//! - `IdempotencyService` - processed-event bookkeeping and retention
//! - `WebhookProcessor` - verified notification dispatch

mod idempotency;
mod process_gateway_webhook;

pub use idempotency::IdempotencyService;
pub use process_gateway_webhook::{WebhookAck, WebhookError, WebhookProcessor};
