//! # haven-api — Axum API Services for the Haven Rental Platform
//!
//! The HTTP layer over the `haven-state` tenancy lifecycle machines:
//! application review, lease execution, payment settlement, and the
//! notification inbox.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                       | Domain              |
//! |-------------------------|------------------------------|---------------------|
//! | `/v1/applications/*`    | [`routes::applications`]     | Application review  |
//! | `/v1/leases/*`          | [`routes::leases`]           | Lease execution     |
//! | `/v1/payments/*`        | [`routes::payments`]         | Payment settlement  |
//! | `/v1/notifications/*`   | [`routes::notifications`]    | Notification inbox  |
//! | `/openapi.json`         | [`openapi`]                  | API description     |
//! | `/health/*`, `/metrics` | `lib.rs`                     | Probes (no auth)    |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## Architecture
//!
//! Route handlers hold no business logic: every transition delegates to a
//! `haven-state` machine inside a store's `try_update` closure, then
//! writes through to Postgres (when configured) and fans the emitted
//! event out through the notification dispatcher. The overdue sweep is
//! the only background task.

pub mod auth;
pub mod bootstrap;
pub mod db;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod sweep;

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

pub use error::AppError;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the
/// auth middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();

    // Body size limit: 1 MiB. Application documents are structured JSON;
    // file uploads do not pass through this service.
    let api = Router::new()
        .merge(routes::applications::router())
        .merge(routes::leases::router())
        .merge(routes::payments::router())
        .merge(routes::notifications::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(prometheus_metrics))
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then gathers and encodes all metrics in Prometheus text
/// exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // Applications by status.
    let mut by_status: HashMap<&'static str, usize> = HashMap::new();
    for app in state.applications.list() {
        *by_status.entry(app.status.as_str()).or_default() += 1;
    }
    metrics.applications_total().reset();
    for (status, count) in &by_status {
        metrics
            .applications_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    // Leases by status.
    let mut by_status: HashMap<&'static str, usize> = HashMap::new();
    for lease in state.leases.list() {
        *by_status.entry(lease.status.as_str()).or_default() += 1;
    }
    metrics.leases_total().reset();
    for (status, count) in &by_status {
        metrics
            .leases_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    // Payments by status.
    let mut by_status: HashMap<&'static str, usize> = HashMap::new();
    for payment in state.payments.list() {
        *by_status.entry(payment.status.as_str()).or_default() += 1;
    }
    metrics.payments_total().reset();
    for (status, count) in &by_status {
        metrics
            .payments_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    // Unread notifications across all inboxes.
    let unread = state
        .notifications
        .list()
        .iter()
        .filter(|n| n.read_at.is_none())
        .count();
    metrics.notifications_unread_total().set(unread as f64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - In-memory stores are accessible.
/// - Database connection is healthy (when configured).
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Verify stores are accessible (read lock acquirable).
    let _ = state.applications.len();
    let _ = state.leases.len();
    let _ = state.payments.len();
    let _ = state.notifications.len();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
