//! Shared wiring for the integration tests: every application service
//! built over the in-memory adapters and one controllable clock.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use membership_engine::adapters::memory::{
    InMemoryCapabilityGrantor, InMemoryLevelCatalog, InMemoryMembershipRepository,
    InMemoryNotificationLog, InMemoryOrderRepository, InMemoryProcessedEventStore,
    InMemoryUserDirectory,
};
use membership_engine::adapters::InMemoryEventBus;
use membership_engine::application::{
    DailySweep, IdempotencyService, MembershipLifecycle, OrderReconciliation,
    ReconciliationSettings, WebhookProcessor,
};
use membership_engine::domain::foundation::{FixedClock, LevelId, Money, Timestamp, UserId};
use membership_engine::domain::gateway::{GatewayKind, GatewayResult};
use membership_engine::domain::membership::{Level, MemberIdentity};
use membership_engine::domain::order::Order;
use membership_engine::ports::{
    EmailError, EmailMessage, EmailSender, FixedGracePolicy, GatewayRegistry, PaymentGateway,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";

pub fn start() -> Timestamp {
    Timestamp::from_unix_secs(1_704_067_200).unwrap()
}

pub fn user(id: i64) -> UserId {
    UserId::new(id).unwrap()
}

pub fn level(id: i64) -> LevelId {
    LevelId::new(id).unwrap()
}

// =============================================================================
// Collaborator doubles
// =============================================================================

#[derive(Default)]
pub struct RecordingEmails {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmails {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn templates(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.template).collect()
    }
}

#[async_trait]
impl EmailSender for RecordingEmails {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Returns a fixed result for every refund and counts the calls.
pub struct ScriptedGateway {
    result: Mutex<GatewayResult>,
    refunds: AtomicUsize,
}

impl ScriptedGateway {
    pub fn returning(result: GatewayResult) -> Self {
        Self {
            result: Mutex::new(result),
            refunds: AtomicUsize::new(0),
        }
    }

    pub fn refund_calls(&self) -> usize {
        self.refunds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Stripe
    }

    async fn charge(&self, _order: &Order) -> GatewayResult {
        GatewayResult::success("Payment processed")
    }

    async fn refund(&self, _order: &Order, _amount: Option<Money>) -> GatewayResult {
        self.refunds.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }

    async fn void(&self, _order: &Order) -> GatewayResult {
        GatewayResult::success("Payment voided")
    }

    async fn cancel_subscription(&self, _subscription_id: &str) -> GatewayResult {
        GatewayResult::success("Subscription cancelled")
    }
}

// =============================================================================
// World
// =============================================================================

pub struct World {
    pub clock: Arc<FixedClock>,
    pub memberships: Arc<InMemoryMembershipRepository>,
    pub levels: Arc<InMemoryLevelCatalog>,
    pub users: Arc<InMemoryUserDirectory>,
    pub grantor: Arc<InMemoryCapabilityGrantor>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub processed: Arc<InMemoryProcessedEventStore>,
    pub markers: Arc<InMemoryNotificationLog>,
    pub bus: Arc<InMemoryEventBus>,
    pub emails: Arc<RecordingEmails>,
    pub gateway: Arc<ScriptedGateway>,
    pub lifecycle: Arc<MembershipLifecycle>,
    pub idempotency: Arc<IdempotencyService>,
    pub webhooks: WebhookProcessor,
    pub sweep: DailySweep,
    pub reconciliation: OrderReconciliation,
}

impl World {
    /// Builds the services with `grace_days` of grace on cancellation and a
    /// gateway that answers every refund with `refund_result`.
    pub async fn new(grace_days: u32, refund_result: GatewayResult) -> Self {
        let clock = Arc::new(FixedClock::new(start()));
        let memberships = Arc::new(InMemoryMembershipRepository::new());
        let levels = Arc::new(InMemoryLevelCatalog::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let grantor = Arc::new(InMemoryCapabilityGrantor::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let processed = Arc::new(InMemoryProcessedEventStore::new());
        let markers = Arc::new(InMemoryNotificationLog::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let emails = Arc::new(RecordingEmails::default());
        let gateway = Arc::new(ScriptedGateway::returning(refund_result));

        levels.put(Level::new(level(1), "Gold")).await;
        levels
            .put(Level::new(level(2), "Platinum").with_custom_capabilities(["forum", "Reports"]))
            .await;
        for id in 1..=5 {
            users
                .put(MemberIdentity {
                    user_id: user(id),
                    login: format!("member{}", id),
                    email: format!("member{}@example.com", id),
                    display_name: format!("Member {}", id),
                })
                .await;
        }

        let lifecycle = Arc::new(MembershipLifecycle::new(
            memberships.clone(),
            levels.clone(),
            users.clone(),
            grantor.clone(),
            Arc::new(FixedGracePolicy::new(grace_days)),
            bus.clone(),
            clock.clone(),
        ));
        let idempotency = Arc::new(IdempotencyService::new(processed.clone(), clock.clone()));
        let webhooks = WebhookProcessor::new(
            idempotency.clone(),
            lifecycle.clone(),
            orders.clone(),
            clock.clone(),
        );
        let sweep = DailySweep::new(
            lifecycle.clone(),
            memberships.clone(),
            markers.clone(),
            emails.clone(),
            clock.clone(),
            7,
        );
        let reconciliation = OrderReconciliation::new(
            orders.clone(),
            users.clone(),
            Arc::new(GatewayRegistry::new().with_gateway(gateway.clone())),
            emails.clone(),
            bus.clone(),
            clock.clone(),
            ReconciliationSettings {
                admin_email: ADMIN_EMAIL.to_string(),
                gateway_timeout: Duration::from_secs(5),
            },
        );

        Self {
            clock,
            memberships,
            levels,
            users,
            grantor,
            orders,
            processed,
            markers,
            bus,
            emails,
            gateway,
            lifecycle,
            idempotency,
            webhooks,
            sweep,
            reconciliation,
        }
    }

    pub async fn with_grace(grace_days: u32) -> Self {
        Self::new(grace_days, GatewayResult::success("Refund processed")).await
    }

    pub async fn capability_tags(&self, user_id: UserId) -> Vec<String> {
        self.grantor
            .capabilities_of(&user_id)
            .await
            .iter()
            .map(|c| c.as_str().to_string())
            .collect()
    }
}
