//! # Lease Execution API
//!
//! Routes:
//! - `GET  /v1/leases/:id` — Get one lease
//! - `POST /v1/leases/:id/send` — Send a drafted lease to the applicant
//! - `POST /v1/leases/:id/accept` — Tenant acceptance
//! - `POST /v1/leases/:id/sign` — Record one side's signature
//! - `POST /v1/leases/:id/move-in` — Schedule the move-in date
//! - `GET  /v1/leases/:id/payments` — Payments on the lease
//!
//! Acceptance materializes the security-deposit obligation; the
//! completing co-signature materializes the first rent obligation. Both
//! happen inside the same request as the transition they follow from.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use haven_core::Role;
use haven_state::{Lease, Payment, SignerSide};

use crate::auth::CallerIdentity;
use crate::dispatch::dispatch;
use crate::envelope::Envelope;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Request to record a signature.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignLeaseRequest {
    /// The side the caller signs for; must match the caller's role.
    #[schema(value_type = String)]
    pub signer_role: Role,
}

impl Validate for SignLeaseRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Request to schedule the move-in date.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveInRequest {
    /// The move-in date; must not precede the lease start date.
    #[schema(value_type = String, format = Date)]
    pub move_in_date: NaiveDate,
}

impl Validate for MoveInRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Build the leases router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/leases/:id", get(get_lease))
        .route("/v1/leases/:id/send", post(send_lease))
        .route("/v1/leases/:id/accept", post(accept_lease))
        .route("/v1/leases/:id/sign", post(sign_lease))
        .route("/v1/leases/:id/move-in", post(schedule_move_in))
        .route("/v1/leases/:id/payments", get(list_lease_payments))
}

/// Whether the caller may see this lease.
fn can_view(lease: &Lease, caller: &CallerIdentity) -> bool {
    match caller.role() {
        Role::Admin => true,
        Role::Tenant => lease.tenant_id == caller.actor_id(),
        Role::Landlord => lease.landlord_id == caller.actor_id(),
        Role::Agent => lease.agent_id == Some(caller.actor_id()),
    }
}

/// GET /v1/leases/:id — Get one lease.
#[utoipa::path(
    get,
    path = "/v1/leases/{id}",
    params(("id" = Uuid, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Lease found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "leases"
)]
async fn get_lease(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Lease>>, AppError> {
    let lease = state
        .leases
        .get(&id)
        .filter(|lease| can_view(lease, &caller))
        .ok_or_else(|| AppError::NotFound(format!("lease {id} not found")))?;
    Ok(Json(Envelope::new(lease)))
}

/// POST /v1/leases/:id/send — Send a drafted lease to the applicant.
#[utoipa::path(
    post,
    path = "/v1/leases/{id}/send",
    params(("id" = Uuid, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Lease sent"),
        (status = 403, description = "Role lacks the capability", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody),
    ),
    tag = "leases"
)]
async fn send_lease(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Lease>>, AppError> {
    let now = Utc::now();
    let updated = state
        .leases
        .try_update(&id, |lease| {
            if !can_view(lease, &caller) {
                return Err(AppError::NotFound(format!("lease {id} not found")));
            }
            let prev = lease.status;
            let event = lease.send(&caller.actor, now)?;
            Ok((lease.clone(), prev, event))
        })
        .ok_or_else(|| AppError::NotFound(format!("lease {id} not found")))?;
    let (lease, prev, event) = updated?;

    crate::db::write_through_lease(&state, &lease, prev).await?;
    dispatch(&state, &[event], &lease.parties(), now).await?;
    Ok(Json(Envelope::new(lease)))
}

/// POST /v1/leases/:id/accept — Tenant acceptance.
///
/// Creates the security-deposit obligation with the amount snapshotted
/// from the lease terms.
#[utoipa::path(
    post,
    path = "/v1/leases/{id}/accept",
    params(("id" = Uuid, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Lease accepted; deposit obligation created"),
        (status = 403, description = "Caller is not the tenant", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody),
    ),
    tag = "leases"
)]
async fn accept_lease(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Lease>>, AppError> {
    let now = Utc::now();
    let updated = state
        .leases
        .try_update(&id, |lease| {
            if !can_view(lease, &caller) {
                return Err(AppError::NotFound(format!("lease {id} not found")));
            }
            let prev = lease.status;
            let event = lease.accept(&caller.actor, now)?;
            Ok((lease.clone(), prev, event))
        })
        .ok_or_else(|| AppError::NotFound(format!("lease {id} not found")))?;
    let (lease, prev, event) = updated?;

    crate::db::write_through_lease(&state, &lease, prev).await?;

    let deposit = Payment::deposit_for(&lease, now);
    state.payments.insert(*deposit.id.as_uuid(), deposit.clone());
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::payments::insert(pool, &deposit).await {
            tracing::error!(payment_id = %deposit.id, error = %e, "failed to persist deposit");
            return Err(AppError::Internal(
                "deposit recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    dispatch(&state, &[event], &lease.parties(), now).await?;
    Ok(Json(Envelope::with_message(
        lease,
        "security deposit obligation created",
    )))
}

/// POST /v1/leases/:id/sign — Record one side's signature.
///
/// The lease advances to `lease_signed` only on the call that completes
/// the co-signature; until then the response returns the lease unchanged
/// at `lease_accepted`. The completing call materializes the first rent
/// obligation, due on the lease start date.
#[utoipa::path(
    post,
    path = "/v1/leases/{id}/sign",
    params(("id" = Uuid, Path, description = "Lease ID")),
    request_body = SignLeaseRequest,
    responses(
        (status = 200, description = "Signature recorded (lease may remain lease_accepted)"),
        (status = 403, description = "Caller may not sign", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody),
    ),
    tag = "leases"
)]
async fn sign_lease(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<SignLeaseRequest>, JsonRejection>,
) -> Result<Json<Envelope<Lease>>, AppError> {
    let req = extract_validated_json(body)?;
    if req.signer_role != caller.role() {
        return Err(AppError::Validation(format!(
            "signer_role '{}' does not match the caller's role '{}'",
            req.signer_role,
            caller.role()
        )));
    }
    if SignerSide::from_role(caller.role()).is_none() {
        return Err(AppError::Forbidden(format!(
            "role {} does not sign leases",
            caller.role()
        )));
    }
    let now = Utc::now();

    let updated = state
        .leases
        .try_update(&id, |lease| {
            if !can_view(lease, &caller) {
                return Err(AppError::NotFound(format!("lease {id} not found")));
            }
            let prev = lease.status;
            let outcome = lease.sign(&caller.actor, now)?;
            Ok((lease.clone(), prev, outcome))
        })
        .ok_or_else(|| AppError::NotFound(format!("lease {id} not found")))?;
    let (lease, prev, outcome) = updated?;

    if outcome.recorded {
        crate::db::write_through_lease(&state, &lease, prev).await?;
    }

    let mut message = None;
    if outcome.fully_signed {
        let first_rent = Payment::rent_for(&lease, lease.terms.start_date, now);
        state
            .payments
            .insert(*first_rent.id.as_uuid(), first_rent.clone());
        if let Some(pool) = &state.db_pool {
            if let Err(e) = crate::db::payments::insert(pool, &first_rent).await {
                tracing::error!(payment_id = %first_rent.id, error = %e, "failed to persist rent");
                return Err(AppError::Internal(
                    "rent obligation recorded in-memory but database persist failed".to_string(),
                ));
            }
        }
        message = Some("lease fully signed; first rent obligation created");
    }
    if let Some(event) = outcome.event {
        dispatch(&state, &[event], &lease.parties(), now).await?;
    }

    let envelope = match message {
        Some(m) => Envelope::with_message(lease, m),
        None => Envelope::new(lease),
    };
    Ok(Json(envelope))
}

/// POST /v1/leases/:id/move-in — Schedule the move-in date.
#[utoipa::path(
    post,
    path = "/v1/leases/{id}/move-in",
    params(("id" = Uuid, Path, description = "Lease ID")),
    request_body = MoveInRequest,
    responses(
        (status = 200, description = "Move-in scheduled"),
        (status = 400, description = "Date precedes lease start", body = crate::error::ErrorBody),
        (status = 403, description = "Role lacks the capability", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Lease not signed", body = crate::error::ErrorBody),
    ),
    tag = "leases"
)]
async fn schedule_move_in(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<MoveInRequest>, JsonRejection>,
) -> Result<Json<Envelope<Lease>>, AppError> {
    let req = extract_validated_json(body)?;
    let now = Utc::now();
    let updated = state
        .leases
        .try_update(&id, |lease| {
            if !can_view(lease, &caller) {
                return Err(AppError::NotFound(format!("lease {id} not found")));
            }
            let prev = lease.status;
            let event = lease.schedule_move_in(req.move_in_date, &caller.actor, now)?;
            Ok((lease.clone(), prev, event))
        })
        .ok_or_else(|| AppError::NotFound(format!("lease {id} not found")))?;
    let (lease, prev, event) = updated?;

    crate::db::write_through_lease(&state, &lease, prev).await?;
    dispatch(&state, &[event], &lease.parties(), now).await?;
    Ok(Json(Envelope::new(lease)))
}

/// GET /v1/leases/:id/payments — Payments on the lease, by due date.
#[utoipa::path(
    get,
    path = "/v1/leases/{id}/payments",
    params(("id" = Uuid, Path, description = "Lease ID")),
    responses(
        (status = 200, description = "Payments on the lease"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "leases"
)]
async fn list_lease_payments(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Vec<Payment>>>, AppError> {
    let lease = state
        .leases
        .get(&id)
        .filter(|lease| can_view(lease, &caller))
        .ok_or_else(|| AppError::NotFound(format!("lease {id} not found")))?;
    Ok(Json(Envelope::new(state.payments_for_lease(&lease.id))))
}
