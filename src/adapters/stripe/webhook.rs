//! Stripe webhook signature verification.
//!
//! Stripe signs `"<timestamp>.<raw body>"` with HMAC-SHA256 under the
//! endpoint's signing secret and sends the result in the `Stripe-Signature`
//! header as `t=<unix>,v1=<hex>[,v1=<hex>...]`. Several `v1` entries appear
//! while a secret is being rolled; any one of them may match.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::Timestamp;
use crate::domain::gateway::{GatewayEvent, GatewayKind};
use crate::ports::{SignatureError, WebhookVerifier};

type HmacSha256 = Hmac<Sha256>;

/// Default accepted age of a signature.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Clock skew allowed for timestamps slightly in the future.
const MAX_FUTURE_SKEW_SECS: i64 = 60;

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part.split_once('=').ok_or(SignatureError::MalformedHeader)?;
            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| SignatureError::MalformedHeader)?,
                    )
                }
                "v1" => v1_signatures
                    .push(hex_decode(value.trim()).ok_or(SignatureError::MalformedHeader)?),
                // v0 and unknown schemes are ignored.
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !v1_signatures.is_empty() => Ok(Self {
                timestamp,
                v1_signatures,
            }),
            _ => Err(SignatureError::MalformedHeader),
        }
    }
}

/// Envelope of a Stripe event as delivered to the endpoint.
#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: Option<i64>,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: Value,
}

pub struct StripeWebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

impl StripeWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    fn expected_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::Mismatch)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl WebhookVerifier for StripeWebhookVerifier {
    fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: Timestamp,
    ) -> Result<GatewayEvent, SignatureError> {
        let header = SignatureHeader::parse(signature_header)?;

        let age = now.as_unix_secs() - header.timestamp;
        if age > self.tolerance_secs || age < -MAX_FUTURE_SKEW_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                age_secs = age,
                "Webhook timestamp outside tolerance"
            );
            return Err(SignatureError::TimestampOutOfTolerance);
        }

        let expected = self.expected_signature(header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| bool::from(expected.as_slice().ct_eq(provided.as_slice())));
        if !matched {
            return Err(SignatureError::Mismatch);
        }

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| SignatureError::InvalidPayload(e.to_string()))?;

        Ok(GatewayEvent {
            id: event.id,
            gateway: GatewayKind::Stripe,
            event_type: event.event_type,
            created_at: event.created.and_then(Timestamp::from_unix_secs),
            object: event.data.object,
        })
    }
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.is_empty() || hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_704_067_200;

    fn verifier() -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(SECRET.to_string()))
    }

    fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, payload).as_bytes());
        hex_encode(&mac.finalize().into_bytes())
    }

    fn payload() -> String {
        r#"{
            "id": "evt_123",
            "type": "charge.refunded",
            "created": 1704067100,
            "data": {"object": {"id": "ch_1", "amount_refunded": 2000}}
        }"#
        .to_string()
    }

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(NOW).unwrap()
    }

    #[test]
    fn parses_header_with_multiple_signatures() {
        let header = SignatureHeader::parse("t=1704067200,v1=abcd,v1=0011,v0=ffff").unwrap();
        assert_eq!(header.timestamp, 1_704_067_200);
        assert_eq!(header.v1_signatures, vec![vec![0xab, 0xcd], vec![0x00, 0x11]]);
    }

    #[test]
    fn rejects_malformed_headers() {
        for header in ["", "t=abc,v1=00", "t=1", "v1=00", "t=1,v1=zz", "t=1,v1=abc", "garbage"] {
            assert_eq!(
                SignatureHeader::parse(header),
                Err(SignatureError::MalformedHeader),
                "header {:?}",
                header
            );
        }
    }

    #[test]
    fn valid_signature_yields_gateway_event() {
        let body = payload();
        let header = format!("t={},v1={}", NOW - 30, sign(SECRET, NOW - 30, &body));

        let event = verifier().verify(body.as_bytes(), &header, now()).unwrap();

        assert_eq!(event.id, "evt_123");
        assert_eq!(event.gateway, GatewayKind::Stripe);
        assert_eq!(event.event_type, "charge.refunded");
        assert_eq!(event.created_at, Timestamp::from_unix_secs(1_704_067_100));
        assert_eq!(event.str_field("id"), Some("ch_1"));
    }

    #[test]
    fn any_rolled_signature_may_match() {
        let body = payload();
        let header = format!(
            "t={},v1={},v1={}",
            NOW,
            sign("whsec_old", NOW, &body),
            sign(SECRET, NOW, &body)
        );
        assert!(verifier().verify(body.as_bytes(), &header, now()).is_ok());
    }

    #[test]
    fn wrong_secret_is_mismatch() {
        let body = payload();
        let header = format!("t={},v1={}", NOW, sign("whsec_other", NOW, &body));
        assert_eq!(
            verifier().verify(body.as_bytes(), &header, now()).unwrap_err(),
            SignatureError::Mismatch
        );
    }

    #[test]
    fn tampered_body_is_mismatch() {
        let body = payload();
        let header = format!("t={},v1={}", NOW, sign(SECRET, NOW, &body));
        let tampered = body.replace("2000", "9000");
        assert_eq!(
            verifier().verify(tampered.as_bytes(), &header, now()).unwrap_err(),
            SignatureError::Mismatch
        );
    }

    #[test]
    fn stale_and_future_timestamps_are_rejected() {
        let body = payload();
        for ts in [NOW - 301, NOW + 61] {
            let header = format!("t={},v1={}", ts, sign(SECRET, ts, &body));
            assert_eq!(
                verifier().verify(body.as_bytes(), &header, now()).unwrap_err(),
                SignatureError::TimestampOutOfTolerance
            );
        }
    }

    #[test]
    fn tolerance_is_configurable() {
        let body = payload();
        let ts = NOW - 600;
        let header = format!("t={},v1={}", ts, sign(SECRET, ts, &body));
        let verifier = verifier().with_tolerance_secs(900);
        assert!(verifier.verify(body.as_bytes(), &header, now()).is_ok());
    }

    #[test]
    fn signed_non_event_is_invalid_payload() {
        let body = r#"{"hello": "world"}"#;
        let header = format!("t={},v1={}", NOW, sign(SECRET, NOW, body));
        assert!(matches!(
            verifier().verify(body.as_bytes(), &header, now()),
            Err(SignatureError::InvalidPayload(_))
        ));
    }
}
