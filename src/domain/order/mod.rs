//! Orders, receipt summaries and refund events.

mod aggregate;
mod discount;
mod events;
mod notes;
mod summary;

pub use aggregate::Order;
pub use discount::RecurringDiscount;
pub use events::OrderEvent;
pub use notes::{OrderNotes, NOTE_SEPARATOR};
pub use summary::ReceiptSummary;
