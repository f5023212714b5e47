//! # Notification Dispatcher
//!
//! Fans a transition event out to its recipients as notification rows,
//! exactly once per `(recipient, transition)`.
//!
//! The at-most-once gate is the idempotency key: a deterministic string
//! derived from the event's source, tag, and recipient. The in-memory key
//! set claims the key atomically; the database insert (when persistence is
//! configured) is `ON CONFLICT DO NOTHING` on the same key, so a retried
//! request replaying a transition that already dispatched produces zero
//! new rows at both layers.

use chrono::{DateTime, Utc};

use haven_state::event::{recipients, Notification, Parties, TransitionEvent};

use crate::error::AppError;
use crate::state::AppState;

/// Dispatch a batch of events against one tenancy's parties.
///
/// Returns the number of notification rows actually created. Failure to
/// persist a created row is an error — the request's contract is "state
/// change plus its notification side effect, or neither observable as
/// committed".
pub async fn dispatch(
    state: &AppState,
    events: &[TransitionEvent],
    parties: &Parties,
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    let mut created = 0;
    for event in events {
        for recipient in recipients(event, parties) {
            let notification = Notification::for_recipient(event, recipient, now);
            if !state.try_insert_notification(notification.clone()) {
                tracing::debug!(
                    key = %notification.idempotency_key,
                    "duplicate transition event suppressed"
                );
                continue;
            }
            if let Some(pool) = &state.db_pool {
                if let Err(e) = crate::db::notifications::insert(pool, &notification).await {
                    tracing::error!(
                        notification_id = %notification.id,
                        error = %e,
                        "failed to persist notification"
                    );
                    return Err(AppError::Internal(
                        "notification recorded in-memory but database persist failed".to_string(),
                    ));
                }
            }
            created += 1;
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::{ActorId, PaymentId};
    use haven_state::event::{EventSource, NotificationKind};

    fn event() -> (TransitionEvent, Parties, ActorId) {
        let tenant = ActorId::new();
        let landlord = ActorId::new();
        let event = TransitionEvent::by_actor(
            EventSource::Payment(PaymentId::new()),
            NotificationKind::PaymentMarkedPaid,
            tenant,
        );
        let parties = Parties {
            tenant,
            landlord,
            agent: None,
        };
        (event, parties, landlord)
    }

    #[tokio::test]
    async fn test_dispatch_creates_one_row_per_recipient() {
        let state = AppState::new();
        let (event, parties, landlord) = event();
        let created = dispatch(&state, &[event], &parties, Utc::now()).await.unwrap();
        assert_eq!(created, 1);
        let inbox = state.notifications_for(landlord, false);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::PaymentMarkedPaid);
    }

    #[tokio::test]
    async fn test_replayed_event_dispatches_nothing() {
        let state = AppState::new();
        let (event, parties, landlord) = event();
        dispatch(&state, &[event.clone()], &parties, Utc::now())
            .await
            .unwrap();
        let repeat = dispatch(&state, &[event], &parties, Utc::now()).await.unwrap();
        assert_eq!(repeat, 0, "retry must be suppressed by the idempotency key");
        assert_eq!(state.notifications_for(landlord, false).len(), 1);
    }
}
