//! # Application Review API
//!
//! Routes:
//! - `POST  /v1/applications` — Submit (or draft) an application
//! - `POST  /v1/applications/:id/submit` — Submit a saved draft
//! - `PATCH /v1/applications/:id/status` — Advance the review
//! - `GET   /v1/applications/:id` — Get one application
//! - `GET   /v1/applications/:id/lease` — The lease derived from it
//! - `GET   /v1/applications` — List visible applications
//!
//! Approval is the coupling point of the lifecycle: a `PATCH` that lands
//! on `approved` or `conditional_approval` also initializes the lease and
//! dispatches its `lease_sent` notification in the same request.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use haven_core::Role;
use haven_state::{
    Application, ApplicationDraft, ApplicationStatus, Lease, LeaseTerms, TransitionEvent,
};

use crate::auth::CallerIdentity;
use crate::dispatch::dispatch;
use crate::envelope::Envelope;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::PaginationParams;
use crate::state::AppState;

/// Request to create an application.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApplicationRequest {
    /// The listed property applied for.
    pub property_id: Uuid,
    /// The listing's owner.
    pub landlord_id: Uuid,
    /// The listing's agent, when one is assigned.
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    /// Last completed wizard step.
    #[serde(default)]
    pub step: u8,
    /// Applicant identity and contact details.
    #[serde(default)]
    pub personal_info: serde_json::Value,
    /// Employment and income history.
    #[serde(default)]
    pub employment: serde_json::Value,
    /// Prior-landlord and personal references.
    #[serde(default)]
    pub references: serde_json::Value,
    /// Required disclosures.
    #[serde(default)]
    pub disclosures: serde_json::Value,
    /// The listing's lease terms snapshot.
    #[schema(value_type = Object)]
    pub terms: LeaseTerms,
    /// Save as a draft instead of submitting.
    #[serde(default)]
    pub draft: bool,
}

impl Validate for CreateApplicationRequest {
    fn validate(&self) -> Result<(), String> {
        if self.landlord_id.is_nil() {
            return Err("landlord_id must not be nil".to_string());
        }
        if self.agent_id == Some(self.landlord_id) {
            return Err("agent_id must differ from landlord_id".to_string());
        }
        if self.step > 16 {
            return Err("step out of range".to_string());
        }
        Ok(())
    }
}

/// Request to advance an application's review status.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceApplicationRequest {
    /// Target status.
    #[schema(value_type = String)]
    pub status: ApplicationStatus,
    /// Optional free-text reason, recorded in the audit log.
    #[serde(default)]
    pub reason: Option<String>,
    /// The status the caller last observed. When present and stale the
    /// request fails with 409 CONFLICT instead of being re-validated
    /// against the fresh status — the client refetches and retries once.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub expected_status: Option<ApplicationStatus>,
    /// When the target is an approval: send the derived lease to the
    /// applicant immediately (default), or hold it as a draft for
    /// offline preparation and a later `POST /v1/leases/:id/send`.
    #[serde(default = "default_send_lease")]
    pub send_lease: bool,
}

fn default_send_lease() -> bool {
    true
}

impl Validate for AdvanceApplicationRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(reason) = &self.reason {
            if reason.len() > 2000 {
                return Err("reason must not exceed 2000 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Build the applications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/applications", get(list_applications).post(create_application))
        .route("/v1/applications/:id", get(get_application))
        .route("/v1/applications/:id/submit", post(submit_application))
        .route("/v1/applications/:id/status", patch(advance_application))
        .route("/v1/applications/:id/lease", get(get_application_lease))
}

/// Whether the caller may see this application at all. Drafts are the
/// applicant's alone; everything else is visible to its own parties.
fn can_view(app: &Application, caller: &CallerIdentity) -> bool {
    match caller.role() {
        Role::Admin => true,
        Role::Tenant => app.applicant_id == caller.actor_id(),
        Role::Landlord => {
            app.landlord_id == caller.actor_id() && app.status != ApplicationStatus::Draft
        }
        Role::Agent => {
            app.agent_id == Some(caller.actor_id()) && app.status != ApplicationStatus::Draft
        }
    }
}

/// POST /v1/applications — Submit (or draft) an application.
#[utoipa::path(
    post,
    path = "/v1/applications",
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Application created"),
        (status = 400, description = "Validation failure", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a tenant", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
async fn create_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<Envelope<Application>>), AppError> {
    let req = extract_validated_json(body)?;
    if caller.role() != Role::Tenant {
        return Err(AppError::Forbidden(
            "only tenants submit rental applications".to_string(),
        ));
    }
    let now = Utc::now();
    let draft = ApplicationDraft {
        property_id: req.property_id.into(),
        applicant_id: caller.actor_id(),
        landlord_id: req.landlord_id.into(),
        agent_id: req.agent_id.map(Into::into),
        step: req.step,
        personal_info: req.personal_info,
        employment: req.employment,
        references: req.references,
        disclosures: req.disclosures,
        terms: req.terms,
    };

    let (app, event) = if req.draft {
        (Application::save_draft(draft, now)?, None)
    } else {
        let (app, event) = Application::submit(draft, now)?;
        (app, Some(event))
    };

    state.applications.insert(*app.id.as_uuid(), app.clone());
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::applications::insert(pool, &app).await {
            tracing::error!(application_id = %app.id, error = %e, "failed to persist application");
            return Err(AppError::Internal(
                "application recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    if let Some(event) = event {
        dispatch(&state, &[event], &app.parties(), now).await?;
    }

    Ok((axum::http::StatusCode::CREATED, Json(Envelope::new(app))))
}

/// POST /v1/applications/:id/submit — Submit a saved draft.
#[utoipa::path(
    post,
    path = "/v1/applications/{id}/submit",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Draft submitted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not a draft", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
async fn submit_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Application>>, AppError> {
    let now = Utc::now();
    let updated = state
        .applications
        .try_update(&id, |app| {
            if !can_view(app, &caller) {
                // 404 instead of 403 to prevent id enumeration.
                return Err(AppError::NotFound(format!("application {id} not found")));
            }
            let prev = app.status;
            let event = app.submit_saved(&caller.actor, now)?;
            Ok((app.clone(), prev, event))
        })
        .ok_or_else(|| AppError::NotFound(format!("application {id} not found")))?;
    let (app, prev, event) = updated?;

    crate::db::write_through_application(&state, &app, prev).await?;
    dispatch(&state, &[event], &app.parties(), now).await?;

    Ok(Json(Envelope::new(app)))
}

/// PATCH /v1/applications/:id/status — Advance the review.
///
/// On approval the lease is initialized (`lease_sent`) in the same
/// request; the response's `message` says so and the client fetches the
/// lease through `/v1/applications/:id/lease`.
#[utoipa::path(
    patch,
    path = "/v1/applications/{id}/status",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = AdvanceApplicationRequest,
    responses(
        (status = 200, description = "Review advanced"),
        (status = 403, description = "Role lacks the capability", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition or lost race", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
async fn advance_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<AdvanceApplicationRequest>, JsonRejection>,
) -> Result<Json<Envelope<Application>>, AppError> {
    let req = extract_validated_json(body)?;
    let now = Utc::now();

    let updated = state
        .applications
        .try_update(&id, |app| {
            if !can_view(app, &caller) {
                return Err(AppError::NotFound(format!("application {id} not found")));
            }
            if let Some(expected) = req.expected_status {
                if app.status != expected {
                    return Err(AppError::Conflict(format!(
                        "application is {}, caller expected {}",
                        app.status, expected
                    )));
                }
            }
            let prev = app.status;
            let event = app.advance(req.status, &caller.actor, req.reason.clone(), now)?;
            Ok((app.clone(), prev, event))
        })
        .ok_or_else(|| AppError::NotFound(format!("application {id} not found")))?;
    let (app, prev, event) = updated?;

    crate::db::write_through_application(&state, &app, prev).await?;

    // Approval derives the lease — exactly once per application.
    let mut events: Vec<TransitionEvent> = vec![event];
    let mut lease_created = false;
    if app.status.is_approved() && state.lease_for_application(&app.id).is_none() {
        let (lease, lease_event) = Lease::initialize(&app, req.send_lease, now)?;
        state.insert_lease(lease.clone())?;
        if let Some(pool) = &state.db_pool {
            if let Err(e) = crate::db::leases::insert(pool, &lease).await {
                tracing::error!(lease_id = %lease.id, error = %e, "failed to persist lease");
                return Err(AppError::Internal(
                    "lease recorded in-memory but database persist failed".to_string(),
                ));
            }
        }
        events.extend(lease_event);
        lease_created = true;
    }
    dispatch(&state, &events, &app.parties(), now).await?;

    let envelope = if lease_created {
        let note = if req.send_lease {
            "lease created and sent to the applicant"
        } else {
            "lease drafted; send it when ready"
        };
        Envelope::with_message(app, note)
    } else {
        Envelope::new(app)
    };
    Ok(Json(envelope))
}

/// GET /v1/applications/:id — Get one application.
#[utoipa::path(
    get,
    path = "/v1/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application found"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
async fn get_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Application>>, AppError> {
    let app = state
        .applications
        .get(&id)
        .filter(|app| can_view(app, &caller))
        .ok_or_else(|| AppError::NotFound(format!("application {id} not found")))?;
    Ok(Json(Envelope::new(app)))
}

/// GET /v1/applications/:id/lease — The lease derived from an application.
#[utoipa::path(
    get,
    path = "/v1/applications/{id}/lease",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Lease found"),
        (status = 404, description = "No lease for this application", body = crate::error::ErrorBody),
    ),
    tag = "applications"
)]
async fn get_application_lease(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<haven_state::Lease>>, AppError> {
    let app = state
        .applications
        .get(&id)
        .filter(|app| can_view(app, &caller))
        .ok_or_else(|| AppError::NotFound(format!("application {id} not found")))?;
    let lease = state
        .lease_for_application(&app.id)
        .ok_or_else(|| AppError::NotFound(format!("application {id} has no lease")))?;
    Ok(Json(Envelope::new(lease)))
}

/// GET /v1/applications — List applications visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/applications",
    params(
        ("limit" = Option<usize>, Query, description = "Max items to return (default 100, max 500)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "List of applications"),
    ),
    tag = "applications"
)]
async fn list_applications(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(pagination): Query<PaginationParams>,
) -> Json<Envelope<Vec<Application>>> {
    let mut visible: Vec<Application> = state
        .applications
        .list()
        .into_iter()
        .filter(|app| can_view(app, &caller))
        .collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(Envelope::new(pagination.page(visible)))
}
