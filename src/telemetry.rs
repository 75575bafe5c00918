//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;

/// Directive used when `RUST_LOG` is not set.
pub fn default_directive(config: &TelemetryConfig) -> String {
    format!(
        "{},membership_engine=debug",
        config.log_level.to_ascii_lowercase()
    )
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_tracing(config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_keeps_crate_at_debug() {
        let config = TelemetryConfig {
            log_level: "WARN".to_string(),
            ..Default::default()
        };
        assert_eq!(default_directive(&config), "warn,membership_engine=debug");
    }

    #[test]
    fn init_twice_does_not_panic() {
        let config = TelemetryConfig::default();
        init_tracing(&config);
        init_tracing(&config);
    }
}
