//! Stripe adapters: the payment gateway and webhook signature verification.
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Signature timestamps outside the tolerance window are rejected
//! - API keys and signing secrets are held as `secrecy::SecretString`

mod gateway;
mod webhook;

pub use gateway::{StripeConfig, StripeGateway};
pub use webhook::{hex_encode, SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS};
