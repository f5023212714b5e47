//! Notification persistence operations.
//!
//! The `idempotency_key` column is UNIQUE and inserts are
//! `ON CONFLICT DO NOTHING` — the durable half of the at-most-once
//! dispatch guarantee.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use haven_state::event::{EventSource, Notification, NotificationKind};

use super::parse_wire;

/// Insert a notification row; a key collision is a silent no-op.
pub async fn insert(pool: &PgPool, n: &Notification) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO notifications (id, recipient_id, source_type, source_id, kind,
         idempotency_key, read_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (idempotency_key) DO NOTHING",
    )
    .bind(n.id.as_uuid())
    .bind(n.recipient_id.as_uuid())
    .bind(n.source.source_type())
    .bind(n.source.source_uuid())
    .bind(n.kind.as_str())
    .bind(&n.idempotency_key)
    .bind(n.read_at)
    .bind(n.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist a read receipt.
pub async fn mark_read(
    pool: &PgPool,
    id: Uuid,
    read_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE notifications SET read_at = $1 WHERE id = $2 AND read_at IS NULL")
            .bind(read_at)
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Persist read receipts for everything unread in one recipient's inbox.
pub async fn mark_all_read(
    pool: &PgPool,
    recipient: Uuid,
    read_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET read_at = $1 WHERE recipient_id = $2 AND read_at IS NULL",
    )
    .bind(read_at)
    .bind(recipient)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Load every notification for startup hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, recipient_id, source_type, source_id, kind, idempotency_key,
         read_at, created_at
         FROM notifications ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_notification() {
            Some(n) => out.push(n),
            None => tracing::warn!("skipping notification row with unparseable source or kind"),
        }
    }
    Ok(out)
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    source_type: String,
    source_id: Uuid,
    kind: String,
    idempotency_key: String,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> Option<Notification> {
        let source = match self.source_type.as_str() {
            "application" => EventSource::Application(self.source_id.into()),
            "lease" => EventSource::Lease(self.source_id.into()),
            "payment" => EventSource::Payment(self.source_id.into()),
            _ => return None,
        };
        let kind: NotificationKind = parse_wire(&self.kind)?;
        Some(Notification {
            id: self.id.into(),
            recipient_id: self.recipient_id.into(),
            source,
            kind,
            idempotency_key: self.idempotency_key,
            read_at: self.read_at,
            created_at: self.created_at,
        })
    }
}
