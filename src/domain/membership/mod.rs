//! Membership domain - subscription lifecycle and capability rules.
//!
//! # Module Structure
//!
//! - `status` - state machine over active / grace / paused / cancelled / expired
//! - `aggregate` - the Membership row and its transitions
//! - `capability` - access tags derived from levels
//! - `billing` - price and cadence terms
//! - `events` - lifecycle events

mod aggregate;
mod billing;
mod capability;
mod errors;
mod events;
mod level;
mod status;
mod view;

pub use aggregate::{Membership, NewMembership};
pub use billing::{BillingTerms, CyclePeriod, TermsUpdate};
pub use capability::{Capability, CapabilitySet};
pub use errors::MembershipError;
pub use events::MembershipEvent;
pub use level::{Level, MemberIdentity};
pub use status::MembershipStatus;
pub use view::MembershipView;
