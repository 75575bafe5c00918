//! Membership handlers.
//!
//! ## Commands
//! - Assigning, cancelling, pausing, resuming and expiring memberships
//! - Recalculating a user's capabilities
//! - The daily expiry sweep
//!
//! ## Queries
//! - Membership views hydrated with level and member display fields

mod daily_sweep;
mod lifecycle;

pub use daily_sweep::{DailySweep, SweepReport};
pub use lifecycle::{AssignOptions, MembershipLifecycle};
