//! # Database Persistence Layer
//!
//! Optional Postgres persistence via SQLx. When `DATABASE_URL` is set the
//! API writes every committed mutation through to the database and
//! re-hydrates the in-memory stores from it at startup. When absent the
//! API runs in-memory only — the demo/dev profile — behind the same store
//! interface.
//!
//! ## Compare-and-set at the durable layer
//!
//! Status updates are guarded: `UPDATE … WHERE id = $1 AND status = $2`
//! with the pre-transition status. The in-memory store already serializes
//! racing transitions, so a zero-row update means the mirror diverged —
//! surfaced as a 500, never papered over.

pub mod applications;
pub mod leases;
pub mod notifications;
pub mod payments;

use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPool, PgPoolOptions};

use haven_state::{Application, Lease, LeaseStatus, Notification, Payment};
use haven_state::{ApplicationStatus, PaymentStatus};

use crate::error::AppError;
use crate::state::AppState;

/// Initialize the connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Load all persisted rows for startup hydration.
pub async fn load_state(
    pool: &PgPool,
) -> Result<(Vec<Application>, Vec<Lease>, Vec<Payment>, Vec<Notification>), sqlx::Error> {
    let applications = applications::load_all(pool).await?;
    let leases = leases::load_all(pool).await?;
    let payments = payments::load_all(pool).await?;
    let notifications = notifications::load_all(pool).await?;
    tracing::info!(
        applications = applications.len(),
        leases = leases.len(),
        payments = payments.len(),
        notifications = notifications.len(),
        "hydrated state from database"
    );
    Ok((applications, leases, payments, notifications))
}

/// Parse a wire-format enum string ("under_review", "lease_sent", …)
/// back into its Rust type via its serde representation.
pub(crate) fn parse_wire<T: DeserializeOwned>(s: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
}

/// Write an application mutation through to the database.
pub async fn write_through_application(
    state: &AppState,
    app: &Application,
    prev: ApplicationStatus,
) -> Result<(), AppError> {
    let Some(pool) = &state.db_pool else {
        return Ok(());
    };
    match applications::update(pool, app, prev).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::error!(application_id = %app.id, "database row diverged from store");
            Err(AppError::Internal(
                "application updated in-memory but database persist failed".to_string(),
            ))
        }
        Err(e) => {
            tracing::error!(application_id = %app.id, error = %e, "application persist failed");
            Err(AppError::Internal(
                "application updated in-memory but database persist failed".to_string(),
            ))
        }
    }
}

/// Write a lease mutation through to the database.
pub async fn write_through_lease(
    state: &AppState,
    lease: &Lease,
    prev: LeaseStatus,
) -> Result<(), AppError> {
    let Some(pool) = &state.db_pool else {
        return Ok(());
    };
    match leases::update(pool, lease, prev).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::error!(lease_id = %lease.id, "database row diverged from store");
            Err(AppError::Internal(
                "lease updated in-memory but database persist failed".to_string(),
            ))
        }
        Err(e) => {
            tracing::error!(lease_id = %lease.id, error = %e, "lease persist failed");
            Err(AppError::Internal(
                "lease updated in-memory but database persist failed".to_string(),
            ))
        }
    }
}

/// Write a payment mutation through to the database.
pub async fn write_through_payment(
    state: &AppState,
    payment: &Payment,
    prev: PaymentStatus,
) -> Result<(), AppError> {
    let Some(pool) = &state.db_pool else {
        return Ok(());
    };
    match payments::update(pool, payment, prev).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::error!(payment_id = %payment.id, "database row diverged from store");
            Err(AppError::Internal(
                "payment updated in-memory but database persist failed".to_string(),
            ))
        }
        Err(e) => {
            tracing::error!(payment_id = %payment.id, error = %e, "payment persist failed");
            Err(AppError::Internal(
                "payment updated in-memory but database persist failed".to_string(),
            ))
        }
    }
}
