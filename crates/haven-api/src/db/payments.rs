//! Payment persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `payments` table.
//! A partial unique index on `(lease_id, due_date) WHERE kind = 'rent'`
//! backstops the sweep's one-obligation-per-period rule.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use haven_core::Money;
use haven_state::{Payment, PaymentKind, PaymentStatus};

use super::parse_wire;

/// Insert a new payment obligation.
pub async fn insert(pool: &PgPool, payment: &Payment) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payments (id, lease_id, kind, amount, due_date, status, reference,
         paid_at, verified_at, verified_by, transitions, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(payment.id.as_uuid())
    .bind(payment.lease_id.as_uuid())
    .bind(payment.kind.as_str())
    .bind(payment.amount.as_cents() as i64)
    .bind(payment.due_date)
    .bind(payment.status.as_str())
    .bind(&payment.reference)
    .bind(payment.paid_at)
    .bind(payment.verified_at)
    .bind(payment.verified_by.as_ref().map(|a| *a.as_uuid()))
    .bind(transitions_json(payment))
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a payment's settlement fields, guarded on the prior status.
///
/// The `amount` column is deliberately absent from the SET list: amounts
/// are immutable after creation and no code path may rewrite one.
pub async fn update(
    pool: &PgPool,
    payment: &Payment,
    prev: PaymentStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments
         SET status = $1, paid_at = $2, verified_at = $3, verified_by = $4,
             transitions = $5, updated_at = $6
         WHERE id = $7 AND status = $8",
    )
    .bind(payment.status.as_str())
    .bind(payment.paid_at)
    .bind(payment.verified_at)
    .bind(payment.verified_by.as_ref().map(|a| *a.as_uuid()))
    .bind(transitions_json(payment))
    .bind(payment.updated_at)
    .bind(payment.id.as_uuid())
    .bind(prev.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Load every payment for startup hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Payment>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PaymentRow>(
        "SELECT id, lease_id, kind, amount, due_date, status, reference,
         paid_at, verified_at, verified_by, transitions, created_at, updated_at
         FROM payments ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_payment() {
            Some(payment) => out.push(payment),
            None => tracing::warn!("skipping payment row with unparseable kind or status"),
        }
    }
    Ok(out)
}

fn transitions_json(payment: &Payment) -> serde_json::Value {
    serde_json::to_value(&payment.transitions).unwrap_or_else(|_| serde_json::json!([]))
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    lease_id: Uuid,
    kind: String,
    amount: i64,
    due_date: NaiveDate,
    status: String,
    reference: String,
    paid_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    verified_by: Option<Uuid>,
    transitions: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Option<Payment> {
        let kind: PaymentKind = parse_wire(&self.kind)?;
        let status: PaymentStatus = parse_wire(&self.status)?;
        let transitions = serde_json::from_value(self.transitions).unwrap_or_default();
        Some(Payment {
            id: self.id.into(),
            lease_id: self.lease_id.into(),
            kind,
            amount: Money::from_cents(self.amount as u64),
            due_date: self.due_date,
            status,
            reference: self.reference,
            paid_at: self.paid_at,
            verified_at: self.verified_at,
            verified_by: self.verified_by.map(Into::into),
            transitions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
