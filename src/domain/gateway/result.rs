//! Uniform outcome of a payment gateway operation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Machine-readable reason a gateway operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    MissingPaymentMethod,
    MissingTransactionId,
    MissingSubscriptionId,
    CardDeclined,
    GatewayError,
    GatewayUnavailable,
    Timeout,
}

impl GatewayErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayErrorCode::MissingPaymentMethod => "missing_payment_method",
            GatewayErrorCode::MissingTransactionId => "missing_transaction_id",
            GatewayErrorCode::MissingSubscriptionId => "missing_subscription_id",
            GatewayErrorCode::CardDeclined => "card_declined",
            GatewayErrorCode::GatewayError => "gateway_error",
            GatewayErrorCode::GatewayUnavailable => "gateway_unavailable",
            GatewayErrorCode::Timeout => "timeout",
        }
    }
}

impl fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged success or failure. Never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GatewayResult {
    Success {
        message: String,
        #[serde(default)]
        data: Map<String, Value>,
    },
    Failure {
        message: String,
        code: GatewayErrorCode,
    },
}

impl GatewayResult {
    pub fn success(message: impl Into<String>) -> Self {
        GatewayResult::Success {
            message: message.into(),
            data: Map::new(),
        }
    }

    pub fn failure(message: impl Into<String>, code: GatewayErrorCode) -> Self {
        GatewayResult::Failure {
            message: message.into(),
            code,
        }
    }

    /// Attaches contextual data to a success. Failures are returned unchanged.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let GatewayResult::Success { data, .. } = &mut self {
            data.insert(key.into(), value.into());
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GatewayResult::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            GatewayResult::Success { message, .. } | GatewayResult::Failure { message, .. } => {
                message
            }
        }
    }

    pub fn error_code(&self) -> Option<GatewayErrorCode> {
        match self {
            GatewayResult::Failure { code, .. } => Some(*code),
            GatewayResult::Success { .. } => None,
        }
    }

    /// Reads a string entry from success data.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        match self {
            GatewayResult::Success { data, .. } => data.get(key).and_then(Value::as_str),
            GatewayResult::Failure { .. } => None,
        }
    }
}
