//! Order handlers: refund reconciliation and receipt re-sends.

mod reconciliation;

pub use reconciliation::{
    OrderReconciliation, ReconciliationError, ReconciliationSettings, RefundOutcome,
    INVOICE_ADMIN_TEMPLATE, INVOICE_TEMPLATE,
};
