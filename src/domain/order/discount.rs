//! Recurring discounts applied to renewals.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, ValidationError};

/// A discount taken off every renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurringDiscount {
    /// Percentage stored in hundredths of a percent (1000 = 10.00%).
    Percent { hundredths: u32 },
    /// Fixed amount off.
    Amount { amount: Money },
}

impl RecurringDiscount {
    pub fn percent(value: f64) -> Self {
        RecurringDiscount::Percent {
            hundredths: (value * 100.0).round().max(0.0) as u32,
        }
    }

    pub fn amount(amount: Money) -> Self {
        RecurringDiscount::Amount { amount }
    }

    /// Builds a discount from stored type/amount columns. A missing type or
    /// a zero amount means no discount.
    pub fn from_parts(kind: Option<&str>, value: f64) -> Result<Option<Self>, ValidationError> {
        let kind = match kind.map(str::trim).filter(|k| !k.is_empty()) {
            Some(kind) => kind,
            None => return Ok(None),
        };
        if value <= 0.0 {
            return Ok(None);
        }
        match kind {
            "percent" => Ok(Some(Self::percent(value))),
            "amount" | "fixed" => Ok(Some(Self::amount(Money::from_major(value)))),
            other => Err(ValidationError::invalid_format(
                "recurring_discount_type",
                format!("unknown discount type '{}'", other),
            )),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            RecurringDiscount::Percent { .. } => "percent",
            RecurringDiscount::Amount { .. } => "amount",
        }
    }

    /// The numeric column value: percent or major currency units.
    pub fn value(&self) -> f64 {
        match self {
            RecurringDiscount::Percent { hundredths } => f64::from(*hundredths) / 100.0,
            RecurringDiscount::Amount { amount } => amount.as_major(),
        }
    }

    /// Receipt line, e.g. `Recurring discount: 10.00% off each renewal`.
    pub fn summary(&self) -> String {
        match self {
            RecurringDiscount::Percent { hundredths } => format!(
                "Recurring discount: {}.{:02}% off each renewal",
                hundredths / 100,
                hundredths % 100
            ),
            RecurringDiscount::Amount { amount } => {
                format!("Recurring discount: ${} off each renewal", amount)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_summary_has_two_decimals() {
        assert_eq!(
            RecurringDiscount::percent(10.0).summary(),
            "Recurring discount: 10.00% off each renewal"
        );
        assert_eq!(
            RecurringDiscount::percent(12.5).summary(),
            "Recurring discount: 12.50% off each renewal"
        );
    }

    #[test]
    fn amount_summary_uses_dollars() {
        assert_eq!(
            RecurringDiscount::amount(Money::from_cents(500)).summary(),
            "Recurring discount: $5.00 off each renewal"
        );
    }

    #[test]
    fn from_parts_handles_missing_and_zero() {
        assert_eq!(RecurringDiscount::from_parts(None, 10.0), Ok(None));
        assert_eq!(RecurringDiscount::from_parts(Some("percent"), 0.0), Ok(None));
        assert_eq!(
            RecurringDiscount::from_parts(Some("percent"), 10.0),
            Ok(Some(RecurringDiscount::Percent { hundredths: 1000 }))
        );
        assert!(RecurringDiscount::from_parts(Some("bogus"), 1.0).is_err());
    }

    #[test]
    fn value_roundtrips_through_parts() {
        let discount = RecurringDiscount::amount(Money::from_cents(250));
        let back = RecurringDiscount::from_parts(Some(discount.kind_str()), discount.value()).unwrap();
        assert_eq!(back, Some(discount));
    }
}
