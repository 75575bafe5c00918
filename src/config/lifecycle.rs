//! Membership lifecycle tuning

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Days a cancelled membership keeps its capabilities. Zero disables grace.
    #[serde(default)]
    pub grace_period_days: u32,

    /// How far ahead the daily sweep warns about ending memberships
    #[serde(default = "default_expiry_warning_days")]
    pub expiry_warning_days: u32,

    #[serde(default = "default_retention_days")]
    pub processed_event_retention_days: u32,

    /// Upper bound on any single gateway call made during reconciliation
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,
}

impl LifecycleConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.processed_event_retention_days == 0 {
            return Err(ValidationError::InvalidRetention);
        }
        if self.gateway_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("gateway_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_period_days: 0,
            expiry_warning_days: default_expiry_warning_days(),
            processed_event_retention_days: default_retention_days(),
            gateway_timeout_secs: default_gateway_timeout(),
        }
    }
}

fn default_expiry_warning_days() -> u32 {
    7
}

fn default_retention_days() -> u32 {
    90
}

fn default_gateway_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.grace_period_days, 0);
        assert_eq!(config.expiry_warning_days, 7);
        assert_eq!(config.processed_event_retention_days, 90);
        assert_eq!(config.gateway_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_retention_rejected() {
        let config = LifecycleConfig {
            processed_event_retention_days: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRetention));
    }

    #[test]
    fn test_zero_gateway_timeout_rejected() {
        let config = LifecycleConfig {
            gateway_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
