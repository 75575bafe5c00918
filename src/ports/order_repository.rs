//! Order repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId};
use crate::domain::gateway::GatewayKind;
use crate::domain::order::{Order, OrderNotes};

/// Read access to orders plus the one write the engine performs.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Looks an order up by the gateway's payment transaction id.
    async fn find_by_payment_transaction(
        &self,
        gateway: &GatewayKind,
        transaction_id: &str,
    ) -> Result<Option<Order>, DomainError>;

    /// Appends an entry to the order's current notes in one storage-level
    /// read-modify-write and returns the resulting notes.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if the order does not exist
    /// - `DatabaseError` on persistence failure
    async fn append_note(&self, id: &OrderId, entry: &str) -> Result<OrderNotes, DomainError>;
}
