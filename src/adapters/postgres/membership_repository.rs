//! PostgreSQL implementation of MembershipRepository.
//!
//! Updates are compare-and-swap on `version`, so two writers holding the
//! same snapshot cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{
    DomainError, ErrorCode, LevelId, MembershipId, Money, Timestamp, UserId,
};
use crate::domain::membership::{
    BillingTerms, CyclePeriod, Membership, MembershipStatus, NewMembership,
};
use crate::ports::MembershipRepository;

use super::{db_error, decode_error, non_negative};

const COLUMNS: &str = r#"
    id, user_id, level_id, status, status_reason, start_date, end_date, grace_end_date,
    paused_at, pause_until, initial_payment, billing_amount, cycle_number, cycle_period,
    billing_limit, trial_amount, trial_limit, created_at, updated_at, version
"#;

pub struct PostgresMembershipRepository {
    pool: PgPool,
}

impl PostgresMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a membership.
#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    id: i64,
    user_id: i64,
    level_id: i64,
    status: String,
    status_reason: Option<String>,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    grace_end_date: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    pause_until: Option<DateTime<Utc>>,
    initial_payment: i64,
    billing_amount: i64,
    cycle_number: i32,
    cycle_period: Option<String>,
    billing_limit: i32,
    trial_amount: i64,
    trial_limit: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DomainError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        let status: MembershipStatus = row.status.parse().map_err(|e| decode_error("status", e))?;
        let cycle_period = row
            .cycle_period
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(str::parse::<CyclePeriod>)
            .transpose()
            .map_err(|e| decode_error("cycle_period", e))?;

        Ok(Membership {
            id: MembershipId::new(row.id).map_err(|e| decode_error("id", e))?,
            user_id: UserId::new(row.user_id).map_err(|e| decode_error("user_id", e))?,
            level_id: LevelId::new(row.level_id).map_err(|e| decode_error("level_id", e))?,
            status,
            status_reason: row.status_reason,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: row.end_date.map(Timestamp::from_datetime),
            grace_end_date: row.grace_end_date.map(Timestamp::from_datetime),
            paused_at: row.paused_at.map(Timestamp::from_datetime),
            pause_until: row.pause_until.map(Timestamp::from_datetime),
            billing: BillingTerms {
                initial_payment: Money::from_cents(row.initial_payment),
                billing_amount: Money::from_cents(row.billing_amount),
                cycle_number: non_negative("cycle_number", row.cycle_number)?,
                cycle_period,
                billing_limit: non_negative("billing_limit", row.billing_limit)?,
                trial_amount: Money::from_cents(row.trial_amount),
                trial_limit: non_negative("trial_limit", row.trial_limit)?,
            },
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

fn as_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl MembershipRepository for PostgresMembershipRepository {
    async fn insert(&self, draft: NewMembership) -> Result<Membership, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO memberships (
                user_id, level_id, status, status_reason, start_date, end_date,
                initial_payment, billing_amount, cycle_number, cycle_period,
                billing_limit, trial_amount, trial_limit, created_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14, 1)
            RETURNING {}
            "#,
            COLUMNS
        );
        let billing = &draft.billing;
        let row: MembershipRow = sqlx::query_as(&sql)
            .bind(draft.user_id.as_i64())
            .bind(draft.level_id.as_i64())
            .bind(MembershipStatus::Active.as_str())
            .bind(&draft.status_reason)
            .bind(draft.start_date.as_datetime())
            .bind(draft.end_date.map(Timestamp::into_datetime))
            .bind(billing.initial_payment.cents())
            .bind(billing.billing_amount.cents())
            .bind(as_i32(billing.cycle_number))
            .bind(billing.cycle_period.map(|p| p.as_str()))
            .bind(as_i32(billing.billing_limit))
            .bind(billing.trial_amount.cents())
            .bind(as_i32(billing.trial_limit))
            .bind(draft.created_at.as_datetime())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to insert membership", e))?;

        Membership::try_from(row)
    }

    async fn update(&self, membership: &Membership) -> Result<Membership, DomainError> {
        let sql = format!(
            r#"
            UPDATE memberships SET
                status = $3,
                status_reason = $4,
                start_date = $5,
                end_date = $6,
                grace_end_date = $7,
                paused_at = $8,
                pause_until = $9,
                initial_payment = $10,
                billing_amount = $11,
                cycle_number = $12,
                cycle_period = $13,
                billing_limit = $14,
                trial_amount = $15,
                trial_limit = $16,
                updated_at = $17,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            COLUMNS
        );
        let billing = &membership.billing;
        let row: Option<MembershipRow> = sqlx::query_as(&sql)
            .bind(membership.id.as_i64())
            .bind(membership.version)
            .bind(membership.status.as_str())
            .bind(&membership.status_reason)
            .bind(membership.start_date.as_datetime())
            .bind(membership.end_date.map(Timestamp::into_datetime))
            .bind(membership.grace_end_date.map(Timestamp::into_datetime))
            .bind(membership.paused_at.map(Timestamp::into_datetime))
            .bind(membership.pause_until.map(Timestamp::into_datetime))
            .bind(billing.initial_payment.cents())
            .bind(billing.billing_amount.cents())
            .bind(as_i32(billing.cycle_number))
            .bind(billing.cycle_period.map(|p| p.as_str()))
            .bind(as_i32(billing.billing_limit))
            .bind(billing.trial_amount.cents())
            .bind(as_i32(billing.trial_limit))
            .bind(membership.updated_at.as_datetime())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update membership", e))?;

        if let Some(row) = row {
            return Membership::try_from(row);
        }

        // Nothing matched: either the row is gone or the version moved on.
        match self.find_by_id(&membership.id).await? {
            None => Err(DomainError::new(
                ErrorCode::MembershipNotFound,
                format!("Membership {} not found", membership.id),
            )),
            Some(current) => Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Membership {} was modified concurrently (expected version {}, found {})",
                    membership.id, membership.version, current.version
                ),
            )
            .with_detail("membership_id", membership.id.to_string())),
        }
    }

    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError> {
        let sql = format!("SELECT {} FROM memberships WHERE id = $1", COLUMNS);
        let row: Option<MembershipRow> = sqlx::query_as(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find membership", e))?;

        row.map(Membership::try_from).transpose()
    }

    async fn find_current(
        &self,
        user_id: &UserId,
        level_id: &LevelId,
    ) -> Result<Option<Membership>, DomainError> {
        let sql = format!(
            "SELECT {} FROM memberships WHERE user_id = $1 AND level_id = $2 ORDER BY id DESC LIMIT 1",
            COLUMNS
        );
        let row: Option<MembershipRow> = sqlx::query_as(&sql)
            .bind(user_id.as_i64())
            .bind(level_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find current membership", e))?;

        row.map(Membership::try_from).transpose()
    }

    async fn find_many(&self, ids: &[MembershipId]) -> Result<Vec<Membership>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(MembershipId::as_i64).collect();
        let sql = format!("SELECT {} FROM memberships WHERE id = ANY($1) ORDER BY id", COLUMNS);
        let rows: Vec<MembershipRow> = sqlx::query_as(&sql)
            .bind(raw)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load memberships", e))?;

        rows.into_iter().map(Membership::try_from).collect()
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError> {
        let sql = format!("SELECT {} FROM memberships WHERE user_id = $1 ORDER BY id", COLUMNS);
        let rows: Vec<MembershipRow> = sqlx::query_as(&sql)
            .bind(user_id.as_i64())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load user memberships", e))?;

        rows.into_iter().map(Membership::try_from).collect()
    }

    async fn find_due_for_expiry(&self, now: &Timestamp) -> Result<Vec<Membership>, DomainError> {
        let sql = format!(
            r#"
            SELECT {} FROM memberships
            WHERE status IN ('active', 'grace', 'paused')
              AND end_date IS NOT NULL
              AND end_date <= $1
            ORDER BY id
            "#,
            COLUMNS
        );
        let rows: Vec<MembershipRow> = sqlx::query_as(&sql)
            .bind(now.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find memberships due for expiry", e))?;

        rows.into_iter().map(Membership::try_from).collect()
    }

    async fn find_ending_between(
        &self,
        from: &Timestamp,
        to: &Timestamp,
    ) -> Result<Vec<Membership>, DomainError> {
        let sql = format!(
            r#"
            SELECT {} FROM memberships
            WHERE status IN ('active', 'grace')
              AND end_date > $1
              AND end_date <= $2
            ORDER BY end_date ASC, id
            "#,
            COLUMNS
        );
        let rows: Vec<MembershipRow> = sqlx::query_as(&sql)
            .bind(from.as_datetime())
            .bind(to.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find expiring memberships", e))?;

        rows.into_iter().map(Membership::try_from).collect()
    }

    async fn delete(&self, id: &MembershipId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete membership", e))?;

        Ok(result.rows_affected() > 0)
    }
}
