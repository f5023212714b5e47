//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Bearer token authentication. Set via HAVEN_AUTH_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Haven API — Tenancy Lifecycle Services",
        version = "0.3.2",
        description = "Axum API services for the Haven rental platform.\n\nProvides:\n- **Application review** with a guarded status graph and audit log\n- **Lease execution** with tenant acceptance and two-party co-signature\n- **Payment ledger** with the tenant-claim / landlord-verify split\n- **Notification inbox** with exactly-once delivery records per transition\n\nAuthentication: Bearer token via `Authorization: Bearer <token>` header.\nAll `/v1/*` endpoints require authentication. Health probes (`/health/*`) and `/metrics` are unauthenticated.",
        license(name = "BUSL-1.1"),
        contact(name = "Haven", url = "https://haven-hq.example")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Applications ─────────────────────────────────────────────
        crate::routes::applications::create_application,
        crate::routes::applications::submit_application,
        crate::routes::applications::advance_application,
        crate::routes::applications::get_application,
        crate::routes::applications::get_application_lease,
        crate::routes::applications::list_applications,
        // ── Leases ───────────────────────────────────────────────────
        crate::routes::leases::get_lease,
        crate::routes::leases::send_lease,
        crate::routes::leases::accept_lease,
        crate::routes::leases::sign_lease,
        crate::routes::leases::schedule_move_in,
        crate::routes::leases::list_lease_payments,
        // ── Payments ─────────────────────────────────────────────────
        crate::routes::payments::get_payment,
        crate::routes::payments::mark_paid,
        crate::routes::payments::verify_payment,
        // ── Notifications ────────────────────────────────────────────
        crate::routes::notifications::list_notifications,
        crate::routes::notifications::mark_read,
        crate::routes::notifications::mark_all_read,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::applications::CreateApplicationRequest,
        crate::routes::applications::AdvanceApplicationRequest,
        crate::routes::leases::SignLeaseRequest,
        crate::routes::leases::MoveInRequest,
    )),
    tags(
        (name = "applications", description = "Application review"),
        (name = "leases", description = "Lease execution"),
        (name = "payments", description = "Payment settlement"),
        (name = "notifications", description = "Notification inbox"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

/// GET /openapi.json — the assembled spec.
async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
