//! # Payment Settlement API
//!
//! Routes:
//! - `GET  /v1/payments/:id` — Get one payment
//! - `POST /v1/payments/:id/mark-paid` — Tenant claim
//! - `POST /v1/payments/:id/verify` — Landlord confirmation
//!
//! The claim carries no proof attachment — no transaction id, no receipt
//! upload. It is a self-report at tenant trust level, and the record
//! stays unsettled until the landlord's verify. Retried calls are
//! no-ops, not errors, so clients may retry on network failure without
//! double-crediting.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use uuid::Uuid;

use haven_core::Role;
use haven_state::{Lease, Payment};

use crate::auth::CallerIdentity;
use crate::dispatch::dispatch;
use crate::envelope::Envelope;
use crate::error::AppError;
use crate::state::AppState;

/// Build the payments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/:id", get(get_payment))
        .route("/v1/payments/:id/mark-paid", post(mark_paid))
        .route("/v1/payments/:id/verify", post(verify_payment))
}

/// Whether the caller is a party to the payment's lease.
fn can_view(lease: &Lease, caller: &CallerIdentity) -> bool {
    match caller.role() {
        Role::Admin => true,
        Role::Tenant => lease.tenant_id == caller.actor_id(),
        Role::Landlord => lease.landlord_id == caller.actor_id(),
        Role::Agent => lease.agent_id == Some(caller.actor_id()),
    }
}

/// Resolve a payment id to its lease, applying the party check.
///
/// Non-parties get 404 rather than 403 to prevent id enumeration. A
/// payment whose lease is missing is a corrupted store, not a client
/// error.
fn lease_for_payment(
    state: &AppState,
    id: &Uuid,
    caller: &CallerIdentity,
) -> Result<(Payment, Lease), AppError> {
    let payment = state
        .payments
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("payment {id} not found")))?;
    let lease = state
        .leases
        .get(payment.lease_id.as_uuid())
        .ok_or_else(|| {
            tracing::error!(payment_id = %payment.id, lease_id = %payment.lease_id, "payment references missing lease");
            AppError::Internal("payment references a missing lease".to_string())
        })?;
    if !can_view(&lease, caller) {
        return Err(AppError::NotFound(format!("payment {id} not found")));
    }
    Ok((payment, lease))
}

/// GET /v1/payments/:id — Get one payment.
#[utoipa::path(
    get,
    path = "/v1/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
async fn get_payment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Payment>>, AppError> {
    let (payment, _) = lease_for_payment(&state, &id, &caller)?;
    Ok(Json(Envelope::new(payment)))
}

/// POST /v1/payments/:id/mark-paid — Tenant claim.
#[utoipa::path(
    post,
    path = "/v1/payments/{id}/mark-paid",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Claim recorded (idempotent)"),
        (status = 403, description = "Caller may not claim", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Payment already verified", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
async fn mark_paid(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Payment>>, AppError> {
    let (_, lease) = lease_for_payment(&state, &id, &caller)?;
    let now = Utc::now();

    let updated = state
        .payments
        .try_update(&id, |payment| {
            let prev = payment.status;
            let event = payment.mark_paid(&caller.actor, now)?;
            Ok((payment.clone(), prev, event))
        })
        .ok_or_else(|| AppError::NotFound(format!("payment {id} not found")))?;
    let (payment, prev, event) = updated?;

    if let Some(event) = event {
        crate::db::write_through_payment(&state, &payment, prev).await?;
        dispatch(&state, &[event], &lease.parties(), now).await?;
    }
    Ok(Json(Envelope::new(payment)))
}

/// POST /v1/payments/:id/verify — Landlord confirmation.
///
/// The terminal settlement. Requires a prior tenant claim; verifying an
/// unclaimed obligation is a 409, by design.
#[utoipa::path(
    post,
    path = "/v1/payments/{id}/verify",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment verified (idempotent)"),
        (status = 403, description = "Caller may not verify", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "No claim to verify", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
async fn verify_payment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Payment>>, AppError> {
    let (_, lease) = lease_for_payment(&state, &id, &caller)?;
    let now = Utc::now();

    let updated = state
        .payments
        .try_update(&id, |payment| {
            let prev = payment.status;
            let event = payment.verify(&caller.actor, now)?;
            Ok((payment.clone(), prev, event))
        })
        .ok_or_else(|| AppError::NotFound(format!("payment {id} not found")))?;
    let (payment, prev, event) = updated?;

    if let Some(event) = event {
        crate::db::write_through_payment(&state, &payment, prev).await?;
        dispatch(&state, &[event], &lease.parties(), now).await?;
    }
    Ok(Json(Envelope::new(payment)))
}
