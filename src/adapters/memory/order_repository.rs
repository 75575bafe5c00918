//! In-memory order storage.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId};
use crate::domain::gateway::GatewayKind;
use crate::domain::order::{Order, OrderNotes};
use crate::ports::OrderRepository;

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces an order, as checkout would.
    pub async fn put(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn find_by_payment_transaction(
        &self,
        gateway: &GatewayKind,
        transaction_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| {
                o.gateway == *gateway && o.payment_transaction_id.as_deref() == Some(transaction_id)
            })
            .max_by_key(|o| o.id)
            .cloned())
    }

    async fn append_note(&self, id: &OrderId, entry: &str) -> Result<OrderNotes, DomainError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::OrderNotFound, format!("Order {} not found", id))
        })?;
        order.notes = order.notes.append(entry);
        Ok(order.notes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{LevelId, Money, Timestamp, UserId};

    fn order(id: i64) -> Order {
        Order::new(
            OrderId::new(id).unwrap(),
            UserId::new(1).unwrap(),
            LevelId::new(1).unwrap(),
            "Gold",
            Money::from_cents(2000),
            GatewayKind::Stripe,
            Timestamp::from_unix_secs(0).unwrap(),
        )
    }

    #[tokio::test]
    async fn append_note_accumulates_entries() {
        let repo = InMemoryOrderRepository::new();
        repo.put(order(1)).await;
        let id = OrderId::new(1).unwrap();

        repo.append_note(&id, "one").await.unwrap();
        let notes = repo.append_note(&id, "two").await.unwrap();

        assert_eq!(notes.as_deref(), Some("one\n\ntwo"));
        assert_eq!(repo.find_by_id(&id).await.unwrap().unwrap().notes, notes);
    }

    #[tokio::test]
    async fn append_note_on_missing_order_fails() {
        let repo = InMemoryOrderRepository::new();
        let err = repo
            .append_note(&OrderId::new(5).unwrap(), "x")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn finds_by_gateway_transaction() {
        let repo = InMemoryOrderRepository::new();
        let mut o = order(3);
        o.payment_transaction_id = Some("pi_3".into());
        repo.put(o).await;

        let found = repo
            .find_by_payment_transaction(&GatewayKind::Stripe, "pi_3")
            .await
            .unwrap();
        assert_eq!(found.map(|o| o.id.as_i64()), Some(3));
        assert!(repo
            .find_by_payment_transaction(&GatewayKind::from("paypal"), "pi_3")
            .await
            .unwrap()
            .is_none());
    }
}
