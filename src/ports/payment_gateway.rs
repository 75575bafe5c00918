//! Payment gateway port.
//!
//! Adapters translate provider responses into [`GatewayResult`] values.
//! Declines, missing data, transport errors and timeouts are all failure
//! results, never Rust errors, and an adapter must return rather than
//! block once its own timeout elapses.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::Money;
use crate::domain::gateway::{GatewayKind, GatewayResult};
use crate::domain::order::Order;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Which provider this adapter talks to.
    fn kind(&self) -> GatewayKind;

    async fn charge(&self, order: &Order) -> GatewayResult;

    /// Refunds `amount`, or the full payment when `None`.
    ///
    /// Success data carries `refund_id`, `amount` and `status`.
    async fn refund(&self, order: &Order, amount: Option<Money>) -> GatewayResult;

    async fn void(&self, order: &Order) -> GatewayResult;

    async fn cancel_subscription(&self, subscription_id: &str) -> GatewayResult;
}

/// Picks the adapter for an order's recorded gateway.
pub trait GatewayResolver: Send + Sync {
    fn resolve(&self, kind: &GatewayKind) -> Option<Arc<dyn PaymentGateway>>;
}

/// Adapters keyed by the gateway they serve, chosen at startup from
/// configuration.
#[derive(Default, Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<GatewayKind, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its own kind, replacing any earlier one.
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.kind(), gateway);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

impl GatewayResolver for GatewayRegistry {
    fn resolve(&self, kind: &GatewayKind) -> Option<Arc<dyn PaymentGateway>> {
        self.gateways.get(kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::GatewayErrorCode;

    struct NamedGateway(GatewayKind);

    #[async_trait]
    impl PaymentGateway for NamedGateway {
        fn kind(&self) -> GatewayKind {
            self.0.clone()
        }

        async fn charge(&self, _order: &Order) -> GatewayResult {
            GatewayResult::success("charged")
        }

        async fn refund(&self, _order: &Order, _amount: Option<Money>) -> GatewayResult {
            GatewayResult::success("refunded")
        }

        async fn void(&self, _order: &Order) -> GatewayResult {
            GatewayResult::failure("not supported", GatewayErrorCode::GatewayError)
        }

        async fn cancel_subscription(&self, _subscription_id: &str) -> GatewayResult {
            GatewayResult::success("cancelled")
        }
    }

    #[test]
    fn registry_resolves_by_kind() {
        let registry = GatewayRegistry::new()
            .with_gateway(Arc::new(NamedGateway(GatewayKind::Stripe)))
            .with_gateway(Arc::new(NamedGateway(GatewayKind::from("check"))));

        assert_eq!(registry.resolve(&GatewayKind::Stripe).unwrap().kind(), GatewayKind::Stripe);
        assert!(registry.resolve(&GatewayKind::from("check")).is_some());
        assert!(registry.resolve(&GatewayKind::from("paypal")).is_none());
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = GatewayRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve(&GatewayKind::Stripe).is_none());
    }
}
