//! Webhook verifier port - authenticates raw gateway deliveries.

use thiserror::Error;

use crate::domain::foundation::Timestamp;
use crate::domain::gateway::GatewayEvent;

/// Why a delivery was rejected before any processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Signature header is missing or malformed")]
    MalformedHeader,

    #[error("Signature timestamp is outside the tolerance window")]
    TimestampOutOfTolerance,

    #[error("No signature matched the payload")]
    Mismatch,

    #[error("Payload is not a valid event: {0}")]
    InvalidPayload(String),
}

/// Checks a delivery's signature and parses it into a `GatewayEvent`.
pub trait WebhookVerifier: Send + Sync {
    fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: Timestamp,
    ) -> Result<GatewayEvent, SignatureError>;
}
