//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    #[serde(default = "default_api_base")]
    pub stripe_api_base: String,

    /// ISO 4217 code sent with charges
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted age of a webhook signature
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_live_")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"));
        }
        if !api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("request_timeout_secs"));
        }
        if self.webhook_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidTimeout("webhook_tolerance_secs"));
        }
        Ok(())
    }
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_webhook_tolerance() -> i64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str, webhook_secret: &str) -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: SecretString::new(api_key.to_string()),
            stripe_webhook_secret: SecretString::new(webhook_secret.to_string()),
            stripe_api_base: default_api_base(),
            currency: default_currency(),
            request_timeout_secs: default_request_timeout(),
            webhook_tolerance_secs: default_webhook_tolerance(),
        }
    }

    #[test]
    fn test_modes() {
        assert!(config("sk_test_xxx", "whsec_xxx").is_test_mode());
        assert!(config("sk_live_xxx", "whsec_xxx").is_live_mode());
        assert!(!config("sk_live_xxx", "whsec_xxx").is_test_mode());
    }

    #[test]
    fn test_validation_missing_values() {
        assert!(config("", "whsec_xxx").validate().is_err());
        assert!(config("sk_test_xxx", "").validate().is_err());
    }

    #[test]
    fn test_validation_prefixes() {
        assert_eq!(
            config("pk_test_xxx", "whsec_xxx").validate(),
            Err(ValidationError::InvalidStripeKey)
        );
        assert_eq!(
            config("sk_test_xxx", "secret_xxx").validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_validation_currency() {
        let mut bad = config("sk_test_xxx", "whsec_xxx");
        bad.currency = "dollars".to_string();
        assert!(matches!(bad.validate(), Err(ValidationError::InvalidCurrency(_))));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let rendered = format!("{:?}", config("sk_test_visible", "whsec_visible"));
        assert!(!rendered.contains("sk_test_visible"));
        assert!(!rendered.contains("whsec_visible"));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(config("sk_test_abcd1234", "whsec_xyz789").validate().is_ok());
    }
}
