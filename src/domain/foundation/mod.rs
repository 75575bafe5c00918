//! Foundation value objects shared by every domain module.

mod clock;
mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{EventId, LevelId, MembershipId, OrderId, UserId};
pub use money::Money;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
