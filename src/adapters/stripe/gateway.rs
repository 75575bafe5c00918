//! Stripe implementation of the payment gateway port.
//!
//! Every call is a form-encoded request against the Stripe REST API,
//! authenticated with the secret key as the basic-auth user. Nothing here
//! returns a Rust error: declines, HTTP failures, unreadable bodies and
//! timeouts all become failure [`GatewayResult`]s.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::foundation::Money;
use crate::domain::gateway::{GatewayErrorCode, GatewayKind, GatewayResult};
use crate::domain::order::Order;
use crate::ports::PaymentGateway;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct StripeConfig {
    pub api_key: SecretString,
    pub api_base_url: String,
    pub currency: String,
    pub request_timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: SecretString, currency: impl Into<String>) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            currency: currency.into().to_ascii_lowercase(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Points the adapter at another host, e.g. a local stub.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Error body Stripe returns with non-2xx responses.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeApiError,
}

#[derive(Debug, Deserialize)]
struct StripeApiError {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
}

pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Sends a request and decodes the returned Stripe object, mapping
    /// every failure mode onto a gateway failure.
    async fn execute(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<StripeObject, GatewayResult> {
        let response = request
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::warn!(operation, "Stripe request timed out");
                    GatewayResult::failure(
                        "Stripe did not respond in time",
                        GatewayErrorCode::Timeout,
                    )
                } else {
                    tracing::error!(operation, error = %e, "Stripe request failed");
                    GatewayResult::failure(
                        format!("Could not reach Stripe: {}", e),
                        GatewayErrorCode::GatewayError,
                    )
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GatewayResult::failure("Stripe did not respond in time", GatewayErrorCode::Timeout)
            } else {
                GatewayResult::failure(
                    format!("Failed to read Stripe response: {}", e),
                    GatewayErrorCode::GatewayError,
                )
            }
        })?;

        if !status.is_success() {
            tracing::error!(operation, status = status.as_u16(), "Stripe API error");
            return Err(failure_from_error_body(status.as_u16(), &body));
        }

        serde_json::from_str::<StripeObject>(&body).map_err(|e| {
            GatewayResult::failure(
                format!("Failed to parse Stripe response: {}", e),
                GatewayErrorCode::GatewayError,
            )
        })
    }
}

/// Maps a non-2xx Stripe response onto a failure result.
fn failure_from_error_body(status: u16, body: &str) -> GatewayResult {
    let parsed = serde_json::from_str::<StripeErrorBody>(body).ok();
    let (error_type, code, message) = match parsed {
        Some(StripeErrorBody { error }) => (error.error_type, error.code, error.message),
        None => (None, None, None),
    };

    let declined =
        error_type.as_deref() == Some("card_error") || code.as_deref() == Some("card_declined");
    let message = message.unwrap_or_else(|| format!("Stripe API error (HTTP {})", status));

    if declined {
        GatewayResult::failure(message, GatewayErrorCode::CardDeclined)
    } else {
        GatewayResult::failure(message, GatewayErrorCode::GatewayError)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Stripe
    }

    async fn charge(&self, order: &Order) -> GatewayResult {
        let Some(payment_method) = non_empty(order.payment_method_id.as_ref()) else {
            return GatewayResult::failure(
                "No payment method provided",
                GatewayErrorCode::MissingPaymentMethod,
            );
        };

        let params = vec![
            ("amount", order.total.cents().to_string()),
            ("currency", self.config.currency.clone()),
            ("payment_method", payment_method.to_string()),
            ("confirm", "true".to_string()),
            ("off_session", "true".to_string()),
            ("metadata[order_id]", order.id.to_string()),
            ("metadata[user_id]", order.user_id.to_string()),
            ("metadata[membership_id]", order.level_id.to_string()),
        ];

        let request = self
            .http_client
            .post(self.url("/v1/payment_intents"))
            .form(&params);

        match self.execute("charge", request).await {
            Ok(intent) => GatewayResult::success("Payment processed")
                .with_data("transaction_id", intent.id)
                .with_data("status", intent.status.unwrap_or_default())
                .with_data("amount", order.total.as_major()),
            Err(failure) => failure,
        }
    }

    async fn refund(&self, order: &Order, amount: Option<Money>) -> GatewayResult {
        let Some(transaction_id) = non_empty(order.payment_transaction_id.as_ref()) else {
            return GatewayResult::failure(
                "No transaction ID provided",
                GatewayErrorCode::MissingTransactionId,
            );
        };

        // Orders may record either the payment intent or the charge.
        let target = if transaction_id.starts_with("ch_") {
            "charge"
        } else {
            "payment_intent"
        };
        let mut params = vec![(target, transaction_id.to_string())];
        if let Some(amount) = amount {
            params.push(("amount", amount.cents().to_string()));
        }

        let request = self.http_client.post(self.url("/v1/refunds")).form(&params);

        match self.execute("refund", request).await {
            Ok(refund) => {
                let refunded = refund
                    .amount
                    .map(Money::from_cents)
                    .or(amount)
                    .unwrap_or(order.total);
                tracing::info!(order_id = %order.id, refund_id = %refund.id, "Stripe refund created");
                GatewayResult::success("Refund processed")
                    .with_data("refund_id", refund.id)
                    .with_data("amount", refunded.as_major())
                    .with_data("status", refund.status.unwrap_or_default())
            }
            Err(failure) => failure,
        }
    }

    async fn void(&self, order: &Order) -> GatewayResult {
        let Some(transaction_id) = non_empty(order.payment_transaction_id.as_ref()) else {
            return GatewayResult::failure(
                "No transaction ID provided",
                GatewayErrorCode::MissingTransactionId,
            );
        };

        let request = self
            .http_client
            .post(self.url(&format!("/v1/payment_intents/{}/cancel", transaction_id)));

        match self.execute("void", request).await {
            Ok(intent) => GatewayResult::success("Payment voided")
                .with_data("transaction_id", intent.id)
                .with_data("status", intent.status.unwrap_or_default()),
            Err(failure) => failure,
        }
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> GatewayResult {
        let subscription_id = subscription_id.trim();
        if subscription_id.is_empty() {
            return GatewayResult::failure(
                "No subscription ID provided",
                GatewayErrorCode::MissingSubscriptionId,
            );
        }

        let request = self
            .http_client
            .delete(self.url(&format!("/v1/subscriptions/{}", subscription_id)));

        match self.execute("cancel_subscription", request).await {
            Ok(subscription) => GatewayResult::success("Subscription cancelled")
                .with_data("subscription_id", subscription.id)
                .with_data("status", subscription.status.unwrap_or_default()),
            Err(failure) => failure,
        }
    }
}
