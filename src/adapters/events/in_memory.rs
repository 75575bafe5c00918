//! In-memory event bus.
//!
//! Delivers each event to registered listeners in registration order and
//! keeps a copy for inspection. Used by tests and by single-process runs
//! where listeners live in the same binary.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{DomainEvent, EventEnvelope};
use crate::ports::{EventListener, EventSink};

/// Observer list plus event capture.
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new().with_listener(audit));
/// reconciliation.handle_refund_recorded(...).await?;
/// assert!(bus.has_event("order.refund_succeeded"));
/// ```
#[derive(Default)]
pub struct InMemoryEventBus {
    listeners: Vec<Arc<dyn EventListener>>,
    published: Mutex<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    // === Inspection ===

    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.lock().clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.lock().len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.lock().iter().any(|e| e.event_type == event_type)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EventEnvelope>> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventSink for InMemoryEventBus {
    async fn publish(&self, event: DomainEvent) {
        let envelope = EventEnvelope::wrap(event);
        self.lock().push(envelope.clone());

        for listener in &self.listeners {
            let wanted = listener.event_types();
            if !wanted.is_empty() && !wanted.iter().any(|t| *t == envelope.event_type) {
                continue;
            }
            if let Err(err) = listener.on_event(&envelope).await {
                tracing::warn!(
                    listener = listener.name(),
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    error = %err,
                    "Event listener failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainError, ErrorCode, Money, OrderId, Timestamp};
    use crate::domain::gateway::{GatewayErrorCode, GatewayResult};
    use crate::domain::order::OrderEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn succeeded() -> DomainEvent {
        OrderEvent::RefundSucceeded {
            order_id: OrderId::new(1).unwrap(),
            refund_id: "re_1".into(),
            amount: Money::from_cents(100),
            reason: None,
            occurred_at: Timestamp::from_unix_secs(0).unwrap(),
        }
        .into()
    }

    fn failed() -> DomainEvent {
        OrderEvent::RefundFailed {
            order_id: OrderId::new(1).unwrap(),
            result: GatewayResult::failure("declined", GatewayErrorCode::CardDeclined),
            occurred_at: Timestamp::from_unix_secs(0).unwrap(),
        }
        .into()
    }

    struct CountingListener {
        types: Vec<&'static str>,
        seen: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EventListener for CountingListener {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn event_types(&self) -> &[&'static str] {
            &self.types
        }

        async fn on_event(&self, _envelope: &EventEnvelope) -> Result<(), DomainError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DomainError::new(ErrorCode::InternalError, "listener down"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn publish_captures_events() {
        let bus = InMemoryEventBus::new();
        bus.publish(succeeded()).await;
        bus.publish(failed()).await;

        assert_eq!(bus.event_count(), 2);
        assert!(bus.has_event("order.refund_failed"));
        assert_eq!(bus.events_of_type("order.refund_succeeded").len(), 1);

        bus.clear();
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn listeners_receive_only_wanted_types() {
        let listener = Arc::new(CountingListener {
            types: vec!["order.refund_failed"],
            seen: AtomicUsize::new(0),
            fail: false,
        });
        let bus = InMemoryEventBus::new().with_listener(listener.clone());

        bus.publish(succeeded()).await;
        bus.publish(failed()).await;

        assert_eq!(listener.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_listener_does_not_stop_delivery() {
        let failing = Arc::new(CountingListener {
            types: vec![],
            seen: AtomicUsize::new(0),
            fail: true,
        });
        let healthy = Arc::new(CountingListener {
            types: vec![],
            seen: AtomicUsize::new(0),
            fail: false,
        });
        let bus = InMemoryEventBus::new()
            .with_listener(failing.clone())
            .with_listener(healthy.clone());

        bus.publish(succeeded()).await;

        assert_eq!(failing.seen.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.event_count(), 1);
    }
}
