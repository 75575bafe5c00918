//! Application configuration module
//!
//! Configuration is read from environment variables with the `MEMBERSHIP`
//! prefix using the `config` and `dotenvy` crates. Nested values are
//! separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use membership_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod email;
mod error;
mod lifecycle;
mod payment;
mod telemetry;

pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use lifecycle::LifecycleConfig;
pub use payment::PaymentConfig;
pub use telemetry::TelemetryConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Stripe credentials. Without them no gateway is registered.
    #[serde(default)]
    pub payment: Option<PaymentConfig>,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` when present, then reads `MEMBERSHIP__*` variables:
    ///
    /// - `MEMBERSHIP__DATABASE__URL=...` -> `database.url`
    /// - `MEMBERSHIP__LIFECYCLE__GRACE_PERIOD_DAYS=3` -> `lifecycle.grace_period_days`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MEMBERSHIP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Loads and validates in one step.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        if let Some(payment) = &self.payment {
            payment.validate()?;
        }
        self.email.validate()?;
        self.lifecycle.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Environment variables are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 7] = [
        "MEMBERSHIP__DATABASE__URL",
        "MEMBERSHIP__EMAIL__ADMIN_EMAIL",
        "MEMBERSHIP__PAYMENT__STRIPE_API_KEY",
        "MEMBERSHIP__PAYMENT__STRIPE_WEBHOOK_SECRET",
        "MEMBERSHIP__LIFECYCLE__GRACE_PERIOD_DAYS",
        "MEMBERSHIP__TELEMETRY__JSON_LOGS",
        "MEMBERSHIP__DATABASE__MAX_CONNECTIONS",
    ];

    fn set_minimal_env() {
        env::set_var("MEMBERSHIP__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("MEMBERSHIP__EMAIL__ADMIN_EMAIL", "admin@example.com");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.email.admin_email, "admin@example.com");
        assert!(config.payment.is_none());
        assert_eq!(config.lifecycle.grace_period_days, 0);
        assert!(!config.telemetry.json_logs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("MEMBERSHIP__LIFECYCLE__GRACE_PERIOD_DAYS", "3"),
            ("MEMBERSHIP__TELEMETRY__JSON_LOGS", "true"),
            ("MEMBERSHIP__DATABASE__MAX_CONNECTIONS", "25"),
        ])
        .unwrap();

        assert_eq!(config.lifecycle.grace_period_days, 3);
        assert!(config.telemetry.json_logs);
        assert_eq!(config.database.max_connections, 25);
    }

    #[test]
    fn test_payment_section() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("MEMBERSHIP__PAYMENT__STRIPE_API_KEY", "sk_test_xxx"),
            ("MEMBERSHIP__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx"),
        ])
        .unwrap();

        let payment = config.payment.as_ref().unwrap();
        assert_eq!(payment.stripe_api_key.expose_secret(), "sk_test_xxx");
        assert_eq!(payment.currency, "usd");
        assert_eq!(payment.webhook_tolerance_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("MEMBERSHIP__EMAIL__ADMIN_EMAIL", "admin@example.com");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_load_validated_reports_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("MEMBERSHIP__DATABASE__URL", "mysql://localhost/test");
        let result = AppConfig::load_validated();
        clear_env();

        assert!(matches!(
            result,
            Err(ConfigError::Validation(ValidationError::InvalidDatabaseUrl))
        ));
    }
}
