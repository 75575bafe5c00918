//! WebhookProcessor - applies verified gateway notifications exactly once.
//!
//! The flow for every delivery is: duplicate check, effect, then record.
//! The caller always gets an acknowledgement back; only a bad signature is
//! surfaced as an error, since the gateway redelivers anything that is not
//! acknowledged.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::Instrument;

use crate::domain::foundation::{Clock, DomainError, ErrorCode, LevelId, UserId};
use crate::domain::gateway::{GatewayEvent, GatewayEventKind};
use crate::domain::membership::MembershipError;
use crate::ports::{OrderRepository, SaveResult, SignatureError, WebhookVerifier};

use super::IdempotencyService;
use crate::application::handlers::membership::{AssignOptions, MembershipLifecycle};

/// Reason recorded when the gateway ends a subscription.
const SUBSCRIPTION_CANCELLED_REASON: &str = "Subscription cancelled at gateway";

/// Reason recorded when a full refund ends a membership.
const FULL_REFUND_REASON: &str = "Payment fully refunded at gateway";

/// What happened to a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAck {
    /// Effects applied (or found moot) and the event recorded.
    Processed,
    /// Already recorded; nothing was applied.
    Duplicate,
    /// Type not acted on; recorded so redeliveries short-circuit.
    Ignored,
    /// A storage failure stopped processing. Left unrecorded for redelivery.
    Failed,
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook rejected: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("Event {event_id} has no usable {field}")]
    MissingReference { event_id: String, field: &'static str },

    #[error(transparent)]
    Membership(#[from] MembershipError),

    #[error(transparent)]
    Storage(#[from] DomainError),
}

impl WebhookError {
    /// True when retrying the delivery cannot change the outcome, so the
    /// event is recorded as handled.
    pub fn is_settled(&self) -> bool {
        match self {
            WebhookError::InvalidSignature(_) | WebhookError::MissingReference { .. } => true,
            WebhookError::Membership(err) => err.is_not_found() || err.is_invalid_transition(),
            WebhookError::Storage(err) => err.is_not_found(),
        }
    }
}

enum Effect {
    Applied,
    Ignored,
}

pub struct WebhookProcessor {
    idempotency: Arc<IdempotencyService>,
    lifecycle: Arc<MembershipLifecycle>,
    orders: Arc<dyn OrderRepository>,
    clock: Arc<dyn Clock>,
}

impl WebhookProcessor {
    pub fn new(
        idempotency: Arc<IdempotencyService>,
        lifecycle: Arc<MembershipLifecycle>,
        orders: Arc<dyn OrderRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            idempotency,
            lifecycle,
            orders,
            clock,
        }
    }

    /// Verifies a raw delivery and processes it.
    ///
    /// # Errors
    ///
    /// `InvalidSignature` when the payload fails verification. Nothing is
    /// recorded in that case.
    pub async fn receive(
        &self,
        verifier: &dyn WebhookVerifier,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookAck, WebhookError> {
        let event = verifier
            .verify(payload, signature_header, self.clock.now())
            .map_err(|err| {
                tracing::warn!(error = %err, "Webhook signature rejected");
                err
            })?;
        Ok(self.process(&event).await)
    }

    /// Processes a verified event.
    pub async fn process(&self, event: &GatewayEvent) -> WebhookAck {
        let span = tracing::info_span!(
            "gateway_webhook",
            event_id = %event.id,
            event_type = %event.event_type,
            gateway = %event.gateway,
        );
        self.process_once(event).instrument(span).await
    }

    async fn process_once(&self, event: &GatewayEvent) -> WebhookAck {
        match self.idempotency.has_processed(&event.id).await {
            Ok(true) => {
                tracing::info!("Duplicate webhook skipped");
                return WebhookAck::Duplicate;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::error!(error = %err, "Idempotency check failed");
                return WebhookAck::Failed;
            }
        }

        let ack = match self.apply(event).await {
            Ok(Effect::Applied) => WebhookAck::Processed,
            Ok(Effect::Ignored) => {
                tracing::debug!("Webhook type not handled");
                WebhookAck::Ignored
            }
            Err(err) if err.is_settled() => {
                tracing::warn!(error = %err, "Webhook effect skipped");
                WebhookAck::Processed
            }
            Err(err) => {
                tracing::error!(error = %err, "Webhook processing failed, left for redelivery");
                return WebhookAck::Failed;
            }
        };

        let metadata = json!({ "type": event.event_type });
        match self
            .idempotency
            .mark_processed(&event.id, event.gateway.clone(), metadata)
            .await
        {
            Ok(SaveResult::Inserted) => ack,
            Ok(SaveResult::AlreadyExists) => {
                tracing::warn!("Concurrent delivery recorded the event first");
                WebhookAck::Duplicate
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to record processed event");
                WebhookAck::Failed
            }
        }
    }

    async fn apply(&self, event: &GatewayEvent) -> Result<Effect, WebhookError> {
        match event.kind() {
            GatewayEventKind::InvoicePaymentSucceeded => {
                let (user_id, level_id) = member_ref(event)?;
                let membership = self
                    .lifecycle
                    .assign(user_id, level_id, AssignOptions::default())
                    .await?;
                tracing::info!(membership_id = %membership.id, "Payment applied to membership");
                Ok(Effect::Applied)
            }
            GatewayEventKind::SubscriptionDeleted => {
                let (user_id, level_id) = member_ref(event)?;
                self.lifecycle
                    .cancel(user_id, level_id, Some(SUBSCRIPTION_CANCELLED_REASON.to_string()))
                    .await?;
                Ok(Effect::Applied)
            }
            GatewayEventKind::SubscriptionUpdated => self.apply_subscription_update(event).await,
            GatewayEventKind::ChargeRefunded => self.apply_charge_refund(event).await,
            GatewayEventKind::Unhandled => Ok(Effect::Ignored),
        }
    }

    async fn apply_charge_refund(&self, event: &GatewayEvent) -> Result<Effect, WebhookError> {
        let transaction_ids = [event.str_field("payment_intent"), event.str_field("id")];
        let mut order = None;
        for transaction_id in transaction_ids.into_iter().flatten() {
            order = self
                .orders
                .find_by_payment_transaction(&event.gateway, transaction_id)
                .await?;
            if order.is_some() {
                break;
            }
        }
        let order = order.ok_or_else(|| {
            DomainError::new(
                ErrorCode::OrderNotFound,
                format!("No order matches charge in event {}", event.id),
            )
        })?;

        let refunded = event
            .amount_field("amount_refunded")
            .ok_or_else(|| missing(event, "amount_refunded"))?;

        // The note is written last so each event appends it at most once.
        if order.is_fully_refunded_by(refunded) {
            match self
                .lifecycle
                .cancel(order.user_id, order.level_id, Some(FULL_REFUND_REASON.to_string()))
                .await
            {
                Ok(_) => {}
                Err(err) if err.is_not_found() || err.is_invalid_transition() => {
                    tracing::warn!(order_id = %order.id, error = %err, "Refunded order has no membership to cancel");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let entry = format!(
            "{} charge refunded at gateway: ${}",
            event.gateway.display_name(),
            refunded
        );
        self.orders.append_note(&order.id, &entry).await?;
        tracing::info!(order_id = %order.id, amount = %refunded, "Gateway refund noted on order");
        Ok(Effect::Applied)
    }

    async fn apply_subscription_update(&self, event: &GatewayEvent) -> Result<Effect, WebhookError> {
        let (user_id, level_id) = member_ref(event)?;

        if let Some(status @ ("canceled" | "incomplete_expired")) = event.str_field("status") {
            tracing::info!(status, "Subscription ended at gateway");
            self.lifecycle
                .cancel(user_id, level_id, Some(SUBSCRIPTION_CANCELLED_REASON.to_string()))
                .await?;
            return Ok(Effect::Applied);
        }

        let terms = event.subscription_terms();
        if terms.is_empty() {
            return Ok(Effect::Ignored);
        }
        let membership = self.lifecycle.update_terms(user_id, level_id, terms).await?;
        tracing::info!(membership_id = %membership.id, "Subscription terms synced to membership");
        Ok(Effect::Applied)
    }
}

fn member_ref(event: &GatewayEvent) -> Result<(UserId, LevelId), WebhookError> {
    event
        .member_ref()
        .ok_or_else(|| missing(event, "user_id/membership_id metadata"))
}

fn missing(event: &GatewayEvent, field: &'static str) -> WebhookError {
    WebhookError::MissingReference {
        event_id: event.id.clone(),
        field,
    }
}
