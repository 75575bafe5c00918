//! Order entity.
//!
//! Orders are created at checkout by the storefront. The engine only reads
//! them and appends to their notes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LevelId, Money, OrderId, Timestamp, UserId};
use crate::domain::gateway::GatewayKind;

use super::{OrderNotes, RecurringDiscount};

/// A billing transaction for one level purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// The level the order paid for.
    pub level_id: LevelId,
    pub level_name: String,
    /// Email captured at checkout. Receipts go to the member's current
    /// address instead.
    pub email: Option<String>,
    pub total: Money,
    pub gateway: GatewayKind,
    pub payment_transaction_id: Option<String>,
    pub subscription_transaction_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub discount_code: Option<String>,
    pub discount_amount: Money,
    pub trial_days: u32,
    pub trial_amount: Money,
    pub recurring_discount: Option<RecurringDiscount>,
    pub notes: OrderNotes,
    pub created_at: Timestamp,
}

impl Order {
    /// A minimal order; optional fields start empty.
    pub fn new(
        id: OrderId,
        user_id: UserId,
        level_id: LevelId,
        level_name: impl Into<String>,
        total: Money,
        gateway: GatewayKind,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            level_id,
            level_name: level_name.into(),
            email: None,
            total,
            gateway,
            payment_transaction_id: None,
            subscription_transaction_id: None,
            payment_method_id: None,
            discount_code: None,
            discount_amount: Money::ZERO,
            trial_days: 0,
            trial_amount: Money::ZERO,
            recurring_discount: None,
            notes: OrderNotes::empty(),
            created_at,
        }
    }

    /// True when `refunded` covers the whole order total.
    pub fn is_fully_refunded_by(&self, refunded: Money) -> bool {
        refunded >= self.total
    }
}
