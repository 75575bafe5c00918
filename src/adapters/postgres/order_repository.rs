//! PostgreSQL implementation of OrderRepository.
//!
//! Notes are appended inside a single UPDATE so concurrent appends on the
//! same order serialize on the row lock and none is lost.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, LevelId, Money, OrderId, Timestamp, UserId};
use crate::domain::gateway::GatewayKind;
use crate::domain::order::{Order, OrderNotes, RecurringDiscount};
use crate::ports::OrderRepository;

use super::{db_error, decode_error, non_negative};

const SELECT_ORDER: &str = r#"
    SELECT o.id, o.user_id, o.level_id, COALESCE(l.name, '') AS level_name, o.email, o.total,
           o.gateway, o.payment_transaction_id, o.subscription_transaction_id,
           o.payment_method_id, o.discount_code, o.discount_amount, o.trial_days,
           o.trial_amount, o.recurring_discount_type, o.recurring_discount_amount,
           o.notes, o.created_at
    FROM membership_orders o
    LEFT JOIN membership_levels l ON l.id = o.level_id
"#;

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    level_id: i64,
    level_name: String,
    email: Option<String>,
    total: i64,
    gateway: String,
    payment_transaction_id: Option<String>,
    subscription_transaction_id: Option<String>,
    payment_method_id: Option<String>,
    discount_code: Option<String>,
    discount_amount: i64,
    trial_days: i32,
    trial_amount: i64,
    recurring_discount_type: Option<String>,
    recurring_discount_amount: f64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let recurring_discount = RecurringDiscount::from_parts(
            row.recurring_discount_type.as_deref(),
            row.recurring_discount_amount,
        )
        .map_err(|e| decode_error("recurring_discount_type", e))?;

        Ok(Order {
            id: OrderId::new(row.id).map_err(|e| decode_error("id", e))?,
            user_id: UserId::new(row.user_id).map_err(|e| decode_error("user_id", e))?,
            level_id: LevelId::new(row.level_id).map_err(|e| decode_error("level_id", e))?,
            level_name: row.level_name,
            email: row.email,
            total: Money::from_cents(row.total),
            gateway: GatewayKind::from(row.gateway),
            payment_transaction_id: row.payment_transaction_id,
            subscription_transaction_id: row.subscription_transaction_id,
            payment_method_id: row.payment_method_id,
            discount_code: row.discount_code,
            discount_amount: Money::from_cents(row.discount_amount),
            trial_days: non_negative("trial_days", row.trial_days)?,
            trial_amount: Money::from_cents(row.trial_amount),
            recurring_discount,
            notes: OrderNotes::from_stored(row.notes),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let sql = format!("{} WHERE o.id = $1", SELECT_ORDER);
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_payment_transaction(
        &self,
        gateway: &GatewayKind,
        transaction_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        let sql = format!(
            "{} WHERE o.gateway = $1 AND o.payment_transaction_id = $2 ORDER BY o.id DESC LIMIT 1",
            SELECT_ORDER
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(gateway.as_str())
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find order by transaction", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn append_note(&self, id: &OrderId, entry: &str) -> Result<OrderNotes, DomainError> {
        let notes: Option<Option<String>> = sqlx::query_scalar(
            r#"
            UPDATE membership_orders
            SET notes = CASE
                WHEN notes IS NULL OR btrim(notes) = '' THEN $2
                ELSE notes || E'\n\n' || $2
            END
            WHERE id = $1
            RETURNING notes
            "#,
        )
        .bind(id.as_i64())
        .bind(entry)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to append order note", e))?;

        match notes {
            Some(text) => Ok(OrderNotes::from_stored(text)),
            None => Err(DomainError::new(
                ErrorCode::OrderNotFound,
                format!("Order {} not found", id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> OrderRow {
        OrderRow {
            id: 12,
            user_id: 5,
            level_id: 3,
            level_name: "Gold".into(),
            email: None,
            total: 5000,
            gateway: "stripe".into(),
            payment_transaction_id: Some("pi_1".into()),
            subscription_transaction_id: None,
            payment_method_id: None,
            discount_code: Some("SAVE10".into()),
            discount_amount: 1000,
            trial_days: 7,
            trial_amount: 0,
            recurring_discount_type: Some("percent".into()),
            recurring_discount_amount: 10.0,
            notes: Some("   ".into()),
            created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn row_converts_to_order() {
        let order = Order::try_from(row()).unwrap();
        assert_eq!(order.gateway, GatewayKind::Stripe);
        assert_eq!(order.discount_amount, Money::from_cents(1000));
        assert_eq!(order.trial_days, 7);
        assert_eq!(order.recurring_discount, Some(RecurringDiscount::percent(10.0)));
        assert!(order.notes.is_empty());
    }

    #[test]
    fn zero_recurring_amount_means_no_discount() {
        let mut r = row();
        r.recurring_discount_amount = 0.0;
        assert_eq!(Order::try_from(r).unwrap().recurring_discount, None);
    }

    #[test]
    fn unknown_discount_type_is_a_decode_error() {
        let mut r = row();
        r.recurring_discount_type = Some("bogo".into());
        let err = Order::try_from(r).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
