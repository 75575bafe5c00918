//! Inbound gateway notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{LevelId, Money, Timestamp, UserId};
use crate::domain::membership::{CyclePeriod, TermsUpdate};

use super::GatewayKind;

/// The notification types the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEventKind {
    InvoicePaymentSucceeded,
    SubscriptionDeleted,
    SubscriptionUpdated,
    ChargeRefunded,
    /// Recognised as well-formed but not acted on.
    Unhandled,
}

impl GatewayEventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "invoice.payment_succeeded" => GatewayEventKind::InvoicePaymentSucceeded,
            "customer.subscription.deleted" | "customer.subscription.canceled" => {
                GatewayEventKind::SubscriptionDeleted
            }
            "customer.subscription.updated" => GatewayEventKind::SubscriptionUpdated,
            "charge.refunded" => GatewayEventKind::ChargeRefunded,
            _ => GatewayEventKind::Unhandled,
        }
    }
}

/// A verified, parsed webhook notification.
///
/// `object` is the provider's payload object (`data.object` for Stripe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub id: String,
    pub gateway: GatewayKind,
    pub event_type: String,
    pub created_at: Option<Timestamp>,
    pub object: Value,
}

impl GatewayEvent {
    pub fn new(
        id: impl Into<String>,
        gateway: GatewayKind,
        event_type: impl Into<String>,
        object: Value,
    ) -> Self {
        Self {
            id: id.into(),
            gateway,
            event_type: event_type.into(),
            created_at: None,
            object,
        }
    }

    pub fn kind(&self) -> GatewayEventKind {
        GatewayEventKind::from_type(&self.event_type)
    }

    /// Reads a top-level string field of the payload object.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.object.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Reads a top-level integer amount (in cents) of the payload object.
    pub fn amount_field(&self, key: &str) -> Option<Money> {
        self.object.get(key).and_then(Value::as_i64).map(Money::from_cents)
    }

    /// Looks a metadata key up on the object, then on subscription details,
    /// then on the first invoice line.
    pub fn metadata(&self, key: &str) -> Option<String> {
        let candidates = [
            self.object.get("metadata"),
            self.object
                .get("subscription_details")
                .and_then(|d| d.get("metadata")),
            self.object
                .get("lines")
                .and_then(|l| l.get("data"))
                .and_then(|d| d.get(0))
                .and_then(|line| line.get("metadata")),
        ];

        candidates
            .into_iter()
            .flatten()
            .filter_map(|meta| meta.get(key))
            .find_map(|value| match value {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    /// The (user, level) pair named in the metadata, if both are present and
    /// valid. `membership_id` carries the level, `level_id` is accepted too.
    pub fn member_ref(&self) -> Option<(UserId, LevelId)> {
        let user_id = self.metadata("user_id")?.parse().ok()?;
        let level_id = self
            .metadata("membership_id")
            .or_else(|| self.metadata("level_id"))?
            .parse()
            .ok()?;
        Some((user_id, level_id))
    }

    /// Billing cadence and period end of a subscription object.
    ///
    /// The price is read from `plan`, then from the first item's `plan` or
    /// `price`. Price objects keep their interval under `recurring`.
    pub fn subscription_terms(&self) -> TermsUpdate {
        let plan = non_null(self.object.get("plan")).or_else(|| {
            let item = self.object.get("items")?.get("data")?.get(0)?;
            non_null(item.get("plan")).or_else(|| non_null(item.get("price")))
        });
        let cadence = plan.map(|p| non_null(p.get("recurring")).unwrap_or(p));

        TermsUpdate {
            billing_amount: plan
                .and_then(|p| {
                    p.get("unit_amount")
                        .and_then(Value::as_i64)
                        .or_else(|| p.get("amount").and_then(Value::as_i64))
                })
                .map(Money::from_cents),
            cycle_number: cadence
                .and_then(|c| c.get("interval_count"))
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok()),
            cycle_period: cadence
                .and_then(|c| c.get("interval"))
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<CyclePeriod>().ok()),
            end_date: self
                .object
                .get("current_period_end")
                .and_then(Value::as_i64)
                .filter(|secs| *secs > 0)
                .and_then(Timestamp::from_unix_secs),
        }
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}
