//! Application persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `applications` table.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use haven_core::Money;
use haven_state::{Application, ApplicationStatus, LeaseTerms};

use super::parse_wire;

/// Insert a new application record.
pub async fn insert(pool: &PgPool, app: &Application) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO applications (id, property_id, applicant_id, landlord_id, agent_id,
         status, step, personal_info, employment, reference_docs, disclosures,
         monthly_rent, security_deposit, rent_due_day, start_date, end_date,
         transitions, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
    )
    .bind(app.id.as_uuid())
    .bind(app.property_id.as_uuid())
    .bind(app.applicant_id.as_uuid())
    .bind(app.landlord_id.as_uuid())
    .bind(app.agent_id.as_ref().map(|a| *a.as_uuid()))
    .bind(app.status.as_str())
    .bind(i16::from(app.step))
    .bind(&app.personal_info)
    .bind(&app.employment)
    .bind(&app.references)
    .bind(&app.disclosures)
    .bind(app.terms.monthly_rent.as_cents() as i64)
    .bind(app.terms.security_deposit.as_cents() as i64)
    .bind(i16::from(app.terms.rent_due_day))
    .bind(app.terms.start_date)
    .bind(app.terms.end_date)
    .bind(transitions_json(app))
    .bind(app.created_at)
    .bind(app.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update an application's mutable fields, guarded on the prior status.
///
/// Returns `false` when the guard did not match (the durable row no
/// longer holds the status the store transitioned from).
pub async fn update(
    pool: &PgPool,
    app: &Application,
    prev: ApplicationStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE applications
         SET status = $1, step = $2, transitions = $3, updated_at = $4
         WHERE id = $5 AND status = $6",
    )
    .bind(app.status.as_str())
    .bind(i16::from(app.step))
    .bind(transitions_json(app))
    .bind(app.updated_at)
    .bind(app.id.as_uuid())
    .bind(prev.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Load every application for startup hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Application>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ApplicationRow>(
        "SELECT id, property_id, applicant_id, landlord_id, agent_id, status, step,
         personal_info, employment, reference_docs, disclosures,
         monthly_rent, security_deposit, rent_due_day, start_date, end_date,
         transitions, created_at, updated_at
         FROM applications ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_application() {
            Some(app) => out.push(app),
            None => tracing::warn!("skipping application row with unparseable status"),
        }
    }
    Ok(out)
}

fn transitions_json(app: &Application) -> serde_json::Value {
    serde_json::to_value(&app.transitions).unwrap_or_else(|_| serde_json::json!([]))
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: Uuid,
    property_id: Uuid,
    applicant_id: Uuid,
    landlord_id: Uuid,
    agent_id: Option<Uuid>,
    status: String,
    step: i16,
    personal_info: serde_json::Value,
    employment: serde_json::Value,
    reference_docs: serde_json::Value,
    disclosures: serde_json::Value,
    monthly_rent: i64,
    security_deposit: i64,
    rent_due_day: i16,
    start_date: NaiveDate,
    end_date: NaiveDate,
    transitions: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApplicationRow {
    fn into_application(self) -> Option<Application> {
        let status: ApplicationStatus = parse_wire(&self.status)?;
        let transitions = serde_json::from_value(self.transitions).unwrap_or_default();
        Some(Application {
            id: self.id.into(),
            property_id: self.property_id.into(),
            applicant_id: self.applicant_id.into(),
            landlord_id: self.landlord_id.into(),
            agent_id: self.agent_id.map(Into::into),
            status,
            step: self.step as u8,
            personal_info: self.personal_info,
            employment: self.employment,
            references: self.reference_docs,
            disclosures: self.disclosures,
            terms: LeaseTerms {
                monthly_rent: Money::from_cents(self.monthly_rent as u64),
                security_deposit: Money::from_cents(self.security_deposit as u64),
                rent_due_day: self.rent_due_day as u8,
                start_date: self.start_date,
                end_date: self.end_date,
            },
            transitions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
