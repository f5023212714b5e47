//! # Notification Inbox API
//!
//! Routes:
//! - `GET   /v1/notifications` — The caller's inbox, newest first
//! - `PATCH /v1/notifications/:id/read` — Mark one read
//! - `POST  /v1/notifications/mark-all-read` — Mark everything read
//!
//! Delivery is observation: dashboards poll this inbox (or ride any push
//! channel layered on top of it) and a dispatched notification is
//! guaranteed to eventually appear here. Read receipts are idempotent —
//! marking a read notification read again changes nothing and is not an
//! error.

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use haven_state::Notification;

use crate::auth::CallerIdentity;
use crate::envelope::Envelope;
use crate::error::AppError;
use crate::routes::PaginationParams;
use crate::state::AppState;

/// Inbox query parameters.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct InboxParams {
    /// Only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
    /// Maximum number of items to return (default: 100, max: 500).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
}

/// Build the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/:id/read", patch(mark_read))
        .route("/v1/notifications/mark-all-read", post(mark_all_read))
}

/// GET /v1/notifications — The caller's inbox.
#[utoipa::path(
    get,
    path = "/v1/notifications",
    params(
        ("unread_only" = Option<bool>, Query, description = "Only unread notifications"),
        ("limit" = Option<usize>, Query, description = "Max items to return (default 100, max 500)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "The caller's notifications, newest first"),
    ),
    tag = "notifications"
)]
async fn list_notifications(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<InboxParams>,
) -> Json<Envelope<Vec<Notification>>> {
    let inbox = state.notifications_for(caller.actor_id(), params.unread_only);
    let pagination = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    Json(Envelope::new(pagination.page(inbox)))
}

/// PATCH /v1/notifications/:id/read — Mark one notification read.
#[utoipa::path(
    patch,
    path = "/v1/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read (idempotent)"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "notifications"
)]
async fn mark_read(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Notification>>, AppError> {
    let now = Utc::now();
    let updated = state
        .notifications
        .try_update(&id, |n| {
            if n.recipient_id != caller.actor_id() {
                // Inboxes are private; foreign ids read as absent.
                return Err(AppError::NotFound(format!("notification {id} not found")));
            }
            let newly_read = n.mark_read(now);
            Ok((n.clone(), newly_read))
        })
        .ok_or_else(|| AppError::NotFound(format!("notification {id} not found")))?;
    let (notification, newly_read) = updated?;

    if newly_read {
        if let Some(pool) = &state.db_pool {
            if let Err(e) = crate::db::notifications::mark_read(pool, id, now).await {
                tracing::error!(notification_id = %id, error = %e, "read receipt persist failed");
                return Err(AppError::Internal(
                    "read receipt recorded in-memory but database persist failed".to_string(),
                ));
            }
        }
    }
    Ok(Json(Envelope::new(notification)))
}

/// POST /v1/notifications/mark-all-read — Mark the whole inbox read.
#[utoipa::path(
    post,
    path = "/v1/notifications/mark-all-read",
    responses(
        (status = 200, description = "Count of notifications newly marked read"),
    ),
    tag = "notifications"
)]
async fn mark_all_read(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Envelope<serde_json::Value>>, AppError> {
    let now = Utc::now();
    let recipient = caller.actor_id();
    let count = state.notifications.update_each(|n| {
        if n.recipient_id == recipient && n.read_at.is_none() {
            n.mark_read(now)
        } else {
            false
        }
    });

    if count > 0 {
        if let Some(pool) = &state.db_pool {
            if let Err(e) =
                crate::db::notifications::mark_all_read(pool, *recipient.as_uuid(), now).await
            {
                tracing::error!(error = %e, "bulk read receipt persist failed");
                return Err(AppError::Internal(
                    "read receipts recorded in-memory but database persist failed".to_string(),
                ));
            }
        }
    }
    Ok(Json(Envelope::new(serde_json::json!({ "count": count }))))
}
