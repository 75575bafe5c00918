//! Billing terms recorded on a membership.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Money, Timestamp, ValidationError};

/// Unit of a billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePeriod {
    Day,
    Week,
    Month,
    Year,
}

impl CyclePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePeriod::Day => "day",
            CyclePeriod::Week => "week",
            CyclePeriod::Month => "month",
            CyclePeriod::Year => "year",
        }
    }
}

impl fmt::Display for CyclePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CyclePeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(CyclePeriod::Day),
            "week" => Ok(CyclePeriod::Week),
            "month" => Ok(CyclePeriod::Month),
            "year" => Ok(CyclePeriod::Year),
            other => Err(ValidationError::invalid_format(
                "cycle_period",
                format!("unknown cycle period '{}'", other),
            )),
        }
    }
}

/// Price and cadence a membership was sold with.
///
/// A limit of zero means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillingTerms {
    pub initial_payment: Money,
    pub billing_amount: Money,
    pub cycle_number: u32,
    pub cycle_period: Option<CyclePeriod>,
    pub billing_limit: u32,
    pub trial_amount: Money,
    pub trial_limit: u32,
}

impl BillingTerms {
    /// One-off payment with no renewals.
    pub fn one_time(initial_payment: Money) -> Self {
        Self {
            initial_payment,
            ..Self::default()
        }
    }

    /// True when the terms describe a renewing subscription.
    pub fn is_recurring(&self) -> bool {
        self.billing_amount.is_positive() && self.cycle_number > 0 && self.cycle_period.is_some()
    }

    pub fn has_trial(&self) -> bool {
        self.trial_limit > 0
    }
}

/// Terms reported by the gateway for a running subscription.
///
/// Each `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermsUpdate {
    pub billing_amount: Option<Money>,
    pub cycle_number: Option<u32>,
    pub cycle_period: Option<CyclePeriod>,
    pub end_date: Option<Timestamp>,
}

impl TermsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overlays the reported fields on `terms`.
    pub fn apply_to(&self, terms: &mut BillingTerms) {
        if let Some(amount) = self.billing_amount {
            terms.billing_amount = amount;
        }
        if let Some(number) = self.cycle_number {
            terms.cycle_number = number;
        }
        if let Some(period) = self.cycle_period {
            terms.cycle_period = Some(period);
        }
    }
}
