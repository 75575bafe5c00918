//! OrderReconciliation - refund bookkeeping and receipt re-sends.
//!
//! A refund makes exactly one gateway call per invocation. Success appends
//! a note to the order and publishes `order.refund_succeeded`; failure
//! leaves the notes untouched and publishes `order.refund_failed`. Retries
//! are the caller's business.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::domain::foundation::{Clock, DomainError, Money, OrderId, UserId};
use crate::domain::gateway::{GatewayErrorCode, GatewayResult};
use crate::domain::membership::MemberIdentity;
use crate::domain::order::{Order, OrderEvent, OrderNotes, ReceiptSummary};
use crate::ports::{
    EmailError, EmailMessage, EmailSender, EventSink, GatewayResolver, OrderRepository,
    PaymentGateway, UserDirectory,
};

pub const INVOICE_TEMPLATE: &str = "invoice";
pub const INVOICE_ADMIN_TEMPLATE: &str = "invoice_admin";

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Member {user_id} for order {order_id} not found")]
    MemberNotFound { order_id: OrderId, user_id: UserId },

    #[error("Failed to send {template} email: {source}")]
    Email {
        template: &'static str,
        #[source]
        source: EmailError,
    },

    #[error(transparent)]
    Storage(#[from] DomainError),
}

/// What a refund attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RefundOutcome {
    Succeeded {
        refund_id: String,
        amount: Money,
        notes: OrderNotes,
    },
    Failed(GatewayResult),
}

/// Static settings for reconciliation.
#[derive(Debug, Clone)]
pub struct ReconciliationSettings {
    /// Receives the `invoice_admin` copy of every receipt.
    pub admin_email: String,
    /// Upper bound on a single gateway call.
    pub gateway_timeout: Duration,
}

pub struct OrderReconciliation {
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserDirectory>,
    gateways: Arc<dyn GatewayResolver>,
    gateway_override: Option<Arc<dyn PaymentGateway>>,
    emails: Arc<dyn EmailSender>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    settings: ReconciliationSettings,
}

impl OrderReconciliation {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        users: Arc<dyn UserDirectory>,
        gateways: Arc<dyn GatewayResolver>,
        emails: Arc<dyn EmailSender>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        settings: ReconciliationSettings,
    ) -> Self {
        Self {
            orders,
            users,
            gateways,
            gateway_override: None,
            emails,
            events,
            clock,
            settings,
        }
    }

    /// Uses `gateway` for every order regardless of its recorded gateway.
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway_override = Some(gateway);
        self
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Receipts
    // ════════════════════════════════════════════════════════════════════════════

    /// Re-sends the receipt for an order: the member copy first, then the
    /// admin copy. Both use the member's directory identity, not the email
    /// stored on the order.
    pub async fn handle_resend_receipt(&self, order_id: OrderId) -> Result<(), ReconciliationError> {
        let order = self.load(&order_id).await?;
        let member = self
            .users
            .find_user(&order.user_id)
            .await?
            .ok_or(ReconciliationError::MemberNotFound {
                order_id,
                user_id: order.user_id,
            })?;
        let summary = ReceiptSummary::for_order(&order);

        let member_copy = receipt_message(INVOICE_TEMPLATE, &member.email, &order, &member, &summary)
            .set_subject(format!("Your receipt for order #{}", order.id));
        self.send(INVOICE_TEMPLATE, member_copy).await?;

        let admin_copy = receipt_message(
            INVOICE_ADMIN_TEMPLATE,
            &self.settings.admin_email,
            &order,
            &member,
            &summary,
        )
        .set_subject(format!("Receipt for order #{} ({})", order.id, member.login));
        self.send(INVOICE_ADMIN_TEMPLATE, admin_copy).await?;

        tracing::info!(order_id = %order.id, user_id = %order.user_id, "Receipt re-sent");
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Refunds
    // ════════════════════════════════════════════════════════════════════════════

    /// Refunds `amount` of an order through its gateway and records the
    /// outcome.
    ///
    /// `order_snapshot` is the order as the caller saw it; when `None` the
    /// order is loaded. A gateway failure is returned as
    /// `RefundOutcome::Failed`, not as an error.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if no snapshot is given and the order is absent
    /// - `Storage` if the note cannot be written after a successful refund.
    ///   `order.refund_succeeded` has already been published by then.
    pub async fn handle_refund_recorded(
        &self,
        order_id: OrderId,
        amount: Money,
        reason: Option<String>,
        order_snapshot: Option<Order>,
    ) -> Result<RefundOutcome, ReconciliationError> {
        let order = match order_snapshot {
            Some(order) => order,
            None => self.load(&order_id).await?,
        };

        let result = self.refund_once(&order, amount).await;

        if !result.is_success() {
            tracing::warn!(
                order_id = %order_id,
                gateway = %order.gateway,
                code = ?result.error_code(),
                message = result.message(),
                "Refund failed"
            );
            self.events
                .publish(
                    OrderEvent::RefundFailed {
                        order_id,
                        result: result.clone(),
                        occurred_at: self.clock.now(),
                    }
                    .into(),
                )
                .await;
            return Ok(RefundOutcome::Failed(result));
        }

        let refund_id = result.data_str("refund_id").unwrap_or("unknown").to_string();
        let entry = format!(
            "{} refund processed: ${} (Refund ID: {})",
            order.gateway.display_name(),
            amount,
            refund_id
        );
        tracing::info!(order_id = %order_id, refund_id = %refund_id, amount = %amount, "Refund recorded");
        self.events
            .publish(
                OrderEvent::RefundSucceeded {
                    order_id,
                    refund_id: refund_id.clone(),
                    amount,
                    reason,
                    occurred_at: self.clock.now(),
                }
                .into(),
            )
            .await;

        // Success is published before the note write.
        let notes = self.orders.append_note(&order_id, &entry).await.map_err(|err| {
            tracing::error!(
                order_id = %order_id,
                refund_id = %refund_id,
                error = %err,
                "Refund succeeded but the order note could not be written"
            );
            err
        })?;

        Ok(RefundOutcome::Succeeded {
            refund_id,
            amount,
            notes,
        })
    }

    /// One bounded gateway call. A missing adapter or an elapsed timeout
    /// becomes a failure result.
    async fn refund_once(&self, order: &Order, amount: Money) -> GatewayResult {
        let gateway = match &self.gateway_override {
            Some(gateway) => Some(gateway.clone()),
            None => self.gateways.resolve(&order.gateway),
        };
        let Some(gateway) = gateway else {
            return GatewayResult::failure(
                format!("No payment gateway registered for {}", order.gateway.display_name()),
                GatewayErrorCode::GatewayUnavailable,
            );
        };

        match tokio::time::timeout(self.settings.gateway_timeout, gateway.refund(order, Some(amount))).await {
            Ok(result) => result,
            Err(_) => GatewayResult::failure(
                format!(
                    "Gateway did not respond within {}s",
                    self.settings.gateway_timeout.as_secs()
                ),
                GatewayErrorCode::Timeout,
            ),
        }
    }

    async fn load(&self, order_id: &OrderId) -> Result<Order, ReconciliationError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(ReconciliationError::OrderNotFound(*order_id))
    }

    async fn send(&self, template: &'static str, message: EmailMessage) -> Result<(), ReconciliationError> {
        let recipient = message.recipient.clone();
        self.emails.send(message).await.map_err(|source| {
            tracing::warn!(template, recipient = %recipient, error = %source, "Receipt email failed");
            ReconciliationError::Email { template, source }
        })
    }
}

fn receipt_message(
    template: &str,
    recipient: &str,
    order: &Order,
    member: &MemberIdentity,
    summary: &ReceiptSummary,
) -> EmailMessage {
    EmailMessage::new(template, recipient)
        .with_data("order_id", order.id.as_i64())
        .with_data("level_id", order.level_id.as_i64())
        .with_data("level_name", order.level_name.clone())
        .with_data("total", order.total.to_string())
        .with_data("gateway", order.gateway.display_name())
        .with_data("order_date", order.created_at.to_string())
        .with_data("user_login", member.login.clone())
        .with_data("display_name", member.display_name.clone())
        .with_data("user_email", member.email.clone())
        .with_optional("payment_transaction_id", order.payment_transaction_id.clone())
        .with_optional("discount_summary", summary.discount_summary.clone())
        .with_optional("trial_summary", summary.trial_summary.clone())
        .with_optional("recurring_summary", summary.recurring_summary.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{InMemoryOrderRepository, InMemoryUserDirectory};
    use crate::domain::foundation::{FixedClock, LevelId, Timestamp};
    use crate::domain::gateway::GatewayKind;
    use crate::domain::order::RecurringDiscount;
    use crate::domain::DomainEvent;
    use crate::ports::GatewayRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Gateway double returning a fixed refund result and counting calls.
    struct ScriptedGateway {
        result: GatewayResult,
        delay: Option<Duration>,
        refunds: AtomicUsize,
    }

    impl ScriptedGateway {
        fn returning(result: GatewayResult) -> Self {
            Self {
                result,
                delay: None,
                refunds: AtomicUsize::new(0),
            }
        }

        fn slow() -> Self {
            Self {
                delay: Some(Duration::from_secs(5)),
                ..Self::returning(GatewayResult::success("late"))
            }
        }

        fn refund_calls(&self) -> usize {
            self.refunds.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        fn kind(&self) -> GatewayKind {
            GatewayKind::Stripe
        }

        async fn charge(&self, _order: &Order) -> GatewayResult {
            GatewayResult::success("charged")
        }

        async fn refund(&self, _order: &Order, _amount: Option<Money>) -> GatewayResult {
            self.refunds.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.result.clone()
        }

        async fn void(&self, _order: &Order) -> GatewayResult {
            GatewayResult::success("voided")
        }

        async fn cancel_subscription(&self, _subscription_id: &str) -> GatewayResult {
            GatewayResult::success("cancelled")
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<EmailMessage>>,
        reject_template: Option<&'static str>,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
            if self.reject_template == Some(message.template.as_str()) {
                return Err(EmailError::Rejected("mailbox full".into()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct Fixture {
        orders: Arc<InMemoryOrderRepository>,
        users: Arc<InMemoryUserDirectory>,
        bus: Arc<InMemoryEventBus>,
        sender: Arc<RecordingSender>,
        clock: Arc<FixedClock>,
    }

    impl Fixture {
        async fn new(sender: RecordingSender) -> Self {
            let users = Arc::new(InMemoryUserDirectory::new());
            users
                .put(MemberIdentity {
                    user_id: UserId::new(5).unwrap(),
                    login: "grace".into(),
                    email: "grace@example.com".into(),
                    display_name: "Grace H".into(),
                })
                .await;
            Self {
                orders: Arc::new(InMemoryOrderRepository::new()),
                users,
                bus: Arc::new(InMemoryEventBus::new()),
                sender: Arc::new(sender),
                clock: Arc::new(FixedClock::new(Timestamp::from_unix_secs(1_704_067_200).unwrap())),
            }
        }

        fn service(&self, registry: GatewayRegistry) -> OrderReconciliation {
            OrderReconciliation::new(
                self.orders.clone(),
                self.users.clone(),
                Arc::new(registry),
                self.sender.clone(),
                self.bus.clone(),
                self.clock.clone(),
                ReconciliationSettings {
                    admin_email: "admin@example.com".into(),
                    gateway_timeout: Duration::from_millis(50),
                },
            )
        }

        fn sent(&self) -> Vec<EmailMessage> {
            self.sender.sent.lock().unwrap().clone()
        }
    }

    fn order(notes: Option<&str>) -> Order {
        let mut order = Order::new(
            OrderId::new(12).unwrap(),
            UserId::new(5).unwrap(),
            LevelId::new(3).unwrap(),
            "Gold",
            Money::from_cents(5000),
            GatewayKind::Stripe,
            Timestamp::from_unix_secs(1_700_000_000).unwrap(),
        );
        order.payment_transaction_id = Some("pi_1".into());
        order.email = Some("stale@example.com".into());
        order.notes = OrderNotes::from_stored(notes.map(str::to_string));
        order
    }

    fn refund_ok() -> GatewayResult {
        GatewayResult::success("Refund processed")
            .with_data("refund_id", "re_123")
            .with_data("amount", 20.0)
            .with_data("status", "succeeded")
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Refunds
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn successful_refund_appends_note_and_publishes_event() {
        let fx = Fixture::new(RecordingSender::default()).await;
        fx.orders.put(order(Some("Existing note"))).await;
        let gateway = Arc::new(ScriptedGateway::returning(refund_ok()));
        let svc = fx.service(GatewayRegistry::new().with_gateway(gateway.clone()));

        let outcome = svc
            .handle_refund_recorded(
                OrderId::new(12).unwrap(),
                Money::from_major(20.0),
                Some("Requested by member".into()),
                None,
            )
            .await
            .unwrap();

        assert_eq!(gateway.refund_calls(), 1);
        let stored = fx.orders.find_by_id(&OrderId::new(12).unwrap()).await.unwrap().unwrap();
        assert_eq!(
            stored.notes.as_deref(),
            Some("Existing note\n\nStripe refund processed: $20.00 (Refund ID: re_123)")
        );
        assert!(matches!(outcome, RefundOutcome::Succeeded { ref refund_id, .. } if refund_id == "re_123"));

        let events = fx.bus.published_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "order.refund_succeeded");
        match &events[0].payload {
            DomainEvent::Order(OrderEvent::RefundSucceeded {
                order_id,
                refund_id,
                amount,
                reason,
                ..
            }) => {
                assert_eq!(order_id.as_i64(), 12);
                assert_eq!(refund_id, "re_123");
                assert_eq!(*amount, Money::from_cents(2000));
                assert_eq!(reason.as_deref(), Some("Requested by member"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn failed_refund_leaves_notes_absent_and_publishes_failure() {
        let fx = Fixture::new(RecordingSender::default()).await;
        fx.orders.put(order(None)).await;
        let failure = GatewayResult::failure("Card network error", GatewayErrorCode::GatewayError);
        let gateway = Arc::new(ScriptedGateway::returning(failure.clone()));
        let svc = fx.service(GatewayRegistry::new().with_gateway(gateway.clone()));

        let outcome = svc
            .handle_refund_recorded(OrderId::new(12).unwrap(), Money::from_cents(2000), None, None)
            .await
            .unwrap();

        assert_eq!(outcome, RefundOutcome::Failed(failure.clone()));
        assert_eq!(gateway.refund_calls(), 1);
        let stored = fx.orders.find_by_id(&OrderId::new(12).unwrap()).await.unwrap().unwrap();
        assert!(stored.notes.is_empty());
        assert_eq!(stored.notes.as_deref(), None);

        let events = fx.bus.events_of_type("order.refund_failed");
        assert_eq!(events.len(), 1);
        assert_eq!(fx.bus.event_count(), 1);
        assert_eq!(events[0].aggregate_id, "12");
        assert_eq!(
            events[0].payload,
            DomainEvent::Order(OrderEvent::RefundFailed {
                order_id: OrderId::new(12).unwrap(),
                result: failure,
                occurred_at: fx.clock.now(),
            })
        );
    }

    #[tokio::test]
    async fn override_gateway_wins_over_registry() {
        let fx = Fixture::new(RecordingSender::default()).await;
        fx.orders.put(order(None)).await;
        let registered = Arc::new(ScriptedGateway::returning(refund_ok()));
        let override_gateway = Arc::new(ScriptedGateway::returning(refund_ok()));
        let svc = fx
            .service(GatewayRegistry::new().with_gateway(registered.clone()))
            .with_gateway(override_gateway.clone());

        svc.handle_refund_recorded(OrderId::new(12).unwrap(), Money::from_cents(100), None, None)
            .await
            .unwrap();

        assert_eq!(registered.refund_calls(), 0);
        assert_eq!(override_gateway.refund_calls(), 1);
    }

    #[tokio::test]
    async fn missing_adapter_fails_without_gateway_call() {
        let fx = Fixture::new(RecordingSender::default()).await;
        fx.orders.put(order(Some("Existing note"))).await;
        let svc = fx.service(GatewayRegistry::new());

        let outcome = svc
            .handle_refund_recorded(OrderId::new(12).unwrap(), Money::from_cents(100), None, None)
            .await
            .unwrap();

        match outcome {
            RefundOutcome::Failed(result) => {
                assert_eq!(result.error_code(), Some(GatewayErrorCode::GatewayUnavailable))
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(fx.bus.has_event("order.refund_failed"));
        let stored = fx.orders.find_by_id(&OrderId::new(12).unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("Existing note"));
    }

    #[tokio::test]
    async fn slow_gateway_times_out_as_failure() {
        let fx = Fixture::new(RecordingSender::default()).await;
        fx.orders.put(order(None)).await;
        let gateway = Arc::new(ScriptedGateway::slow());
        let svc = fx.service(GatewayRegistry::new().with_gateway(gateway.clone()));

        let outcome = svc
            .handle_refund_recorded(OrderId::new(12).unwrap(), Money::from_cents(100), None, None)
            .await
            .unwrap();

        match outcome {
            RefundOutcome::Failed(result) => {
                assert_eq!(result.error_code(), Some(GatewayErrorCode::Timeout))
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(gateway.refund_calls(), 1);
    }

    #[tokio::test]
    async fn snapshot_is_used_for_the_gateway_call() {
        let fx = Fixture::new(RecordingSender::default()).await;
        let gateway = Arc::new(ScriptedGateway::returning(
            GatewayResult::failure("declined", GatewayErrorCode::CardDeclined),
        ));
        let svc = fx.service(GatewayRegistry::new().with_gateway(gateway.clone()));

        // The snapshot need not be stored for a failing refund.
        let outcome = svc
            .handle_refund_recorded(
                OrderId::new(12).unwrap(),
                Money::from_cents(100),
                None,
                Some(order(None)),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, RefundOutcome::Failed(_)));
        assert_eq!(gateway.refund_calls(), 1);
    }

    #[tokio::test]
    async fn note_failure_after_refund_still_publishes_success() {
        let fx = Fixture::new(RecordingSender::default()).await;
        let gateway = Arc::new(ScriptedGateway::returning(refund_ok()));
        let svc = fx.service(GatewayRegistry::new().with_gateway(gateway.clone()));

        let err = svc
            .handle_refund_recorded(
                OrderId::new(12).unwrap(),
                Money::from_cents(2000),
                None,
                Some(order(None)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReconciliationError::Storage(_)));
        assert_eq!(gateway.refund_calls(), 1);
        assert!(fx.bus.has_event("order.refund_succeeded"));
        assert!(!fx.bus.has_event("order.refund_failed"));
    }

    #[tokio::test]
    async fn refund_for_unknown_order_is_not_found() {
        let fx = Fixture::new(RecordingSender::default()).await;
        let svc = fx.service(GatewayRegistry::new());

        let err = svc
            .handle_refund_recorded(OrderId::new(77).unwrap(), Money::from_cents(100), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconciliationError::OrderNotFound(_)));
        assert_eq!(fx.bus.event_count(), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Receipts
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn resend_receipt_sends_member_then_admin() {
        let fx = Fixture::new(RecordingSender::default()).await;
        let mut o = order(None);
        o.discount_code = Some("SAVE10".into());
        o.discount_amount = Money::from_major(10.0);
        o.trial_days = 7;
        o.recurring_discount = RecurringDiscount::from_parts(Some("percent"), 10.0).unwrap();
        fx.orders.put(o).await;
        let svc = fx.service(GatewayRegistry::new());

        svc.handle_resend_receipt(OrderId::new(12).unwrap()).await.unwrap();

        let sent = fx.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].template, INVOICE_TEMPLATE);
        assert_eq!(sent[0].recipient, "grace@example.com");
        assert_eq!(sent[0].data_str("discount_summary"), Some("Discount SAVE10 applied: -$10.00"));
        assert_eq!(sent[0].data_str("trial_summary"), Some("Free trial: 7 days"));
        assert_eq!(
            sent[0].data_str("recurring_summary"),
            Some("Recurring discount: 10.00% off each renewal")
        );
        assert_eq!(sent[0].data_str("level_name"), Some("Gold"));
        assert_eq!(sent[1].template, INVOICE_ADMIN_TEMPLATE);
        assert_eq!(sent[1].recipient, "admin@example.com");
        assert_eq!(sent[1].data_str("user_email"), Some("grace@example.com"));
    }

    #[tokio::test]
    async fn resend_receipt_omits_absent_summaries() {
        let fx = Fixture::new(RecordingSender::default()).await;
        fx.orders.put(order(None)).await;
        let svc = fx.service(GatewayRegistry::new());

        svc.handle_resend_receipt(OrderId::new(12).unwrap()).await.unwrap();

        let sent = fx.sent();
        assert!(!sent[0].data.contains_key("discount_summary"));
        assert!(!sent[0].data.contains_key("trial_summary"));
        assert!(!sent[0].data.contains_key("recurring_summary"));
    }

    #[tokio::test]
    async fn member_email_failure_skips_admin_copy() {
        let fx = Fixture::new(RecordingSender {
            reject_template: Some(INVOICE_TEMPLATE),
            ..RecordingSender::default()
        })
        .await;
        fx.orders.put(order(None)).await;
        let svc = fx.service(GatewayRegistry::new());

        let err = svc
            .handle_resend_receipt(OrderId::new(12).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconciliationError::Email { template: INVOICE_TEMPLATE, .. }));
        assert!(fx.sent().is_empty());
    }

    #[tokio::test]
    async fn resend_receipt_for_unknown_order_fails() {
        let fx = Fixture::new(RecordingSender::default()).await;
        let svc = fx.service(GatewayRegistry::new());

        let err = svc
            .handle_resend_receipt(OrderId::new(1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconciliationError::OrderNotFound(_)));
    }
}
