//! # Transition Records
//!
//! Every entity keeps an ordered, append-only log of its status changes.
//! Records are never rewritten or deleted; the log is the audit trail the
//! financial side of the platform is required to retain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use haven_core::ActorId;

/// One recorded status change on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord<S> {
    /// Status before the transition.
    pub from: S,
    /// Status after the transition.
    pub to: S,
    /// When the transition was applied.
    pub at: DateTime<Utc>,
    /// The actor who requested it; `None` for system transitions
    /// (the overdue sweep).
    pub actor: Option<ActorId>,
    /// Optional free-text reason supplied by the actor.
    pub reason: Option<String>,
}

impl<S> TransitionRecord<S> {
    /// Build a record for an actor-requested transition.
    pub fn by_actor(
        from: S,
        to: S,
        at: DateTime<Utc>,
        actor: ActorId,
        reason: Option<String>,
    ) -> Self {
        Self {
            from,
            to,
            at,
            actor: Some(actor),
            reason,
        }
    }

    /// Build a record for a system-initiated transition.
    pub fn by_system(from: S, to: S, at: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            at,
            actor: None,
            reason: None,
        }
    }
}
