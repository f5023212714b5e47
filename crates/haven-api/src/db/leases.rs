//! Lease persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `leases` table. The
//! `application_id` column is UNIQUE — the durable form of the
//! one-lease-per-application invariant.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use haven_core::Money;
use haven_state::{Lease, LeaseStatus, LeaseTerms};

use super::parse_wire;

/// Insert a new lease record.
pub async fn insert(pool: &PgPool, lease: &Lease) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO leases (id, application_id, property_id, tenant_id, landlord_id, agent_id,
         status, monthly_rent, security_deposit, rent_due_day, start_date, end_date,
         move_in_date, tenant_signed_at, landlord_signed_at, transitions, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
    )
    .bind(lease.id.as_uuid())
    .bind(lease.application_id.as_uuid())
    .bind(lease.property_id.as_uuid())
    .bind(lease.tenant_id.as_uuid())
    .bind(lease.landlord_id.as_uuid())
    .bind(lease.agent_id.as_ref().map(|a| *a.as_uuid()))
    .bind(lease.status.as_str())
    .bind(lease.terms.monthly_rent.as_cents() as i64)
    .bind(lease.terms.security_deposit.as_cents() as i64)
    .bind(i16::from(lease.terms.rent_due_day))
    .bind(lease.terms.start_date)
    .bind(lease.terms.end_date)
    .bind(lease.move_in_date)
    .bind(lease.tenant_signed_at)
    .bind(lease.landlord_signed_at)
    .bind(transitions_json(lease))
    .bind(lease.created_at)
    .bind(lease.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a lease's mutable fields, guarded on the prior status.
///
/// A partial signature mutates a slot without changing status; the guard
/// then matches the current status, which is still correct — the row must
/// hold the status the store observed when it applied the mutation.
pub async fn update(pool: &PgPool, lease: &Lease, prev: LeaseStatus) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE leases
         SET status = $1, move_in_date = $2, tenant_signed_at = $3,
             landlord_signed_at = $4, transitions = $5, updated_at = $6
         WHERE id = $7 AND status = $8",
    )
    .bind(lease.status.as_str())
    .bind(lease.move_in_date)
    .bind(lease.tenant_signed_at)
    .bind(lease.landlord_signed_at)
    .bind(transitions_json(lease))
    .bind(lease.updated_at)
    .bind(lease.id.as_uuid())
    .bind(prev.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Load every lease for startup hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Lease>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LeaseRow>(
        "SELECT id, application_id, property_id, tenant_id, landlord_id, agent_id,
         status, monthly_rent, security_deposit, rent_due_day, start_date, end_date,
         move_in_date, tenant_signed_at, landlord_signed_at, transitions, created_at, updated_at
         FROM leases ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_lease() {
            Some(lease) => out.push(lease),
            None => tracing::warn!("skipping lease row with unparseable status"),
        }
    }
    Ok(out)
}

fn transitions_json(lease: &Lease) -> serde_json::Value {
    serde_json::to_value(&lease.transitions).unwrap_or_else(|_| serde_json::json!([]))
}

#[derive(sqlx::FromRow)]
struct LeaseRow {
    id: Uuid,
    application_id: Uuid,
    property_id: Uuid,
    tenant_id: Uuid,
    landlord_id: Uuid,
    agent_id: Option<Uuid>,
    status: String,
    monthly_rent: i64,
    security_deposit: i64,
    rent_due_day: i16,
    start_date: NaiveDate,
    end_date: NaiveDate,
    move_in_date: Option<NaiveDate>,
    tenant_signed_at: Option<DateTime<Utc>>,
    landlord_signed_at: Option<DateTime<Utc>>,
    transitions: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LeaseRow {
    fn into_lease(self) -> Option<Lease> {
        let status: LeaseStatus = parse_wire(&self.status)?;
        let transitions = serde_json::from_value(self.transitions).unwrap_or_default();
        Some(Lease {
            id: self.id.into(),
            application_id: self.application_id.into(),
            property_id: self.property_id.into(),
            tenant_id: self.tenant_id.into(),
            landlord_id: self.landlord_id.into(),
            agent_id: self.agent_id.map(Into::into),
            status,
            terms: LeaseTerms {
                monthly_rent: Money::from_cents(self.monthly_rent as u64),
                security_deposit: Money::from_cents(self.security_deposit as u64),
                rent_due_day: self.rent_due_day as u8,
                start_date: self.start_date,
                end_date: self.end_date,
            },
            move_in_date: self.move_in_date,
            tenant_signed_at: self.tenant_signed_at,
            landlord_signed_at: self.landlord_signed_at,
            transitions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
