//! Receipt summary lines derived from order fields.

use serde::Serialize;

use super::Order;

/// Optional, independently formatted receipt lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReceiptSummary {
    pub discount_summary: Option<String>,
    pub trial_summary: Option<String>,
    pub recurring_summary: Option<String>,
}

impl ReceiptSummary {
    pub fn for_order(order: &Order) -> Self {
        let discount_summary = order
            .discount_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(|code| format!("Discount {} applied: -${}", code, order.discount_amount));

        let trial_summary =
            (order.trial_days > 0).then(|| format!("Free trial: {} days", order.trial_days));

        let recurring_summary = order.recurring_discount.as_ref().map(|d| d.summary());

        Self {
            discount_summary,
            trial_summary,
            recurring_summary,
        }
    }
}
