//! # Transition Events & Notification Routing
//!
//! Every successful state-machine transition emits exactly one
//! [`TransitionEvent`]. The dispatcher in the API layer fans an event out to
//! its recipients, deduplicating on a deterministic idempotency key so a
//! retried request can never produce a second delivery record.
//!
//! ## Routing
//!
//! - `application_submitted` notifies the owner side (landlord, plus the
//!   listing agent when one is assigned) and sends the applicant a
//!   confirmation copy.
//! - Review outcomes that demand applicant action or conclude the review
//!   (`info_requested`, `approved`, `conditional_approval`, `rejected`)
//!   notify the applicant as well as the owner side.
//! - Lease events notify the counterparty of the acting side.
//! - Payment claims (`marked_paid`) notify the landlord; verification
//!   notifies the tenant; the overdue sweep notifies both sides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use haven_core::{ActorId, ApplicationId, LeaseId, NotificationId, PaymentId};

/// The entity a transition event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EventSource {
    /// An application status change.
    Application(ApplicationId),
    /// A lease status change.
    Lease(LeaseId),
    /// A payment status change.
    Payment(PaymentId),
}

impl EventSource {
    /// The source entity kind as a wire string.
    pub fn source_type(&self) -> &'static str {
        match self {
            Self::Application(_) => "application",
            Self::Lease(_) => "lease",
            Self::Payment(_) => "payment",
        }
    }

    /// The source entity's raw UUID.
    pub fn source_uuid(&self) -> Uuid {
        match self {
            Self::Application(id) => *id.as_uuid(),
            Self::Lease(id) => *id.as_uuid(),
            Self::Payment(id) => *id.as_uuid(),
        }
    }
}

/// The transition a notification describes. One tag per observable
/// transition; the wire name doubles as the notification type shown to
/// dashboard clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An applicant submitted an application.
    ApplicationSubmitted,
    /// Review started or resumed.
    ApplicationUnderReview,
    /// The reviewer asked the applicant for more information.
    ApplicationInfoRequested,
    /// The application entered background check.
    ApplicationBackgroundCheck,
    /// The application was approved.
    ApplicationApproved,
    /// The application was approved with conditions.
    ApplicationConditionalApproval,
    /// The application was rejected.
    ApplicationRejected,
    /// An admin reopened a rejected application.
    ApplicationReopened,
    /// A lease was sent to the applicant.
    LeaseSent,
    /// The tenant accepted the lease.
    LeaseAccepted,
    /// Both parties signed; the lease is executed.
    LeaseSigned,
    /// A move-in date was scheduled.
    MoveInScheduled,
    /// The tenant claimed a payment as paid.
    PaymentMarkedPaid,
    /// The landlord verified a claimed payment.
    PaymentVerified,
    /// A pending payment passed its due date.
    PaymentOverdue,
}

impl NotificationKind {
    /// The canonical wire tag, e.g. `application_submitted`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationSubmitted => "application_submitted",
            Self::ApplicationUnderReview => "application_under_review",
            Self::ApplicationInfoRequested => "application_info_requested",
            Self::ApplicationBackgroundCheck => "application_background_check",
            Self::ApplicationApproved => "application_approved",
            Self::ApplicationConditionalApproval => "application_conditional_approval",
            Self::ApplicationRejected => "application_rejected",
            Self::ApplicationReopened => "application_reopened",
            Self::LeaseSent => "lease_sent",
            Self::LeaseAccepted => "lease_accepted",
            Self::LeaseSigned => "lease_signed",
            Self::MoveInScheduled => "move_in_scheduled",
            Self::PaymentMarkedPaid => "payment_marked_paid",
            Self::PaymentVerified => "payment_verified",
            Self::PaymentOverdue => "payment_overdue",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An observable state-machine transition, emitted by the machines and
/// consumed by the dispatcher. Idempotent no-op "transitions" (a repeated
/// `mark_paid` on an already-paid record, a second signature on the same
/// slot) emit nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// The entity that transitioned.
    pub source: EventSource,
    /// Which transition occurred.
    pub kind: NotificationKind,
    /// The actor who caused it; `None` for the overdue sweep.
    pub actor: Option<ActorId>,
}

impl TransitionEvent {
    /// Build an event for an actor-caused transition.
    pub fn by_actor(source: EventSource, kind: NotificationKind, actor: ActorId) -> Self {
        Self {
            source,
            kind,
            actor: Some(actor),
        }
    }

    /// Build an event for a system transition.
    pub fn by_system(source: EventSource, kind: NotificationKind) -> Self {
        Self {
            source,
            kind,
            actor: None,
        }
    }
}

/// The parties of a tenancy, used to route an event to its recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parties {
    /// The applicant / tenant.
    pub tenant: ActorId,
    /// The property owner or manager.
    pub landlord: ActorId,
    /// The listing agent, when one is assigned.
    pub agent: Option<ActorId>,
}

impl Parties {
    fn owner_side(&self) -> Vec<ActorId> {
        match self.agent {
            Some(agent) => vec![self.landlord, agent],
            None => vec![self.landlord],
        }
    }
}

/// Compute the recipients of a transition event.
///
/// The returned list is deduplicated and never contains more than one
/// entry per actor; dispatch derives one notification row per recipient.
pub fn recipients(event: &TransitionEvent, parties: &Parties) -> Vec<ActorId> {
    use NotificationKind::*;

    let mut out = match event.kind {
        // Owner side, plus the applicant's confirmation copy.
        ApplicationSubmitted => {
            let mut v = parties.owner_side();
            v.push(parties.tenant);
            v
        }
        // Progress markers stay on the owner side's queue.
        ApplicationUnderReview | ApplicationBackgroundCheck | ApplicationReopened => {
            parties.owner_side()
        }
        // Outcomes the applicant must see.
        ApplicationInfoRequested
        | ApplicationApproved
        | ApplicationConditionalApproval
        | ApplicationRejected => {
            let mut v = parties.owner_side();
            v.push(parties.tenant);
            v
        }
        // Lease events go to the counterparty of the acting side.
        LeaseSent => vec![parties.tenant],
        LeaseAccepted => parties.owner_side(),
        LeaseSigned => {
            // Execution concerns both sides; the actor who completed the
            // signature is filtered below.
            let mut v = parties.owner_side();
            v.push(parties.tenant);
            v
        }
        MoveInScheduled => vec![parties.tenant],
        // Tenant claim notifies the landlord; verification notifies the
        // tenant; the sweep notifies both sides.
        PaymentMarkedPaid => vec![parties.landlord],
        PaymentVerified => vec![parties.tenant],
        PaymentOverdue => vec![parties.tenant, parties.landlord],
    };

    // An actor is not notified of their own action, with one exception:
    // the applicant's submission confirmation copy is deliberate.
    if event.kind != ApplicationSubmitted {
        if let Some(actor) = event.actor {
            out.retain(|r| *r != actor);
        }
    }
    out.dedup();
    out
}

/// Deterministic idempotency key for one `(transition, recipient)` pair.
///
/// The key is derived, never stored client-side: a retried request that
/// replays the same transition produces the same key and is suppressed by
/// the dispatcher. Keys are per-recipient so the applicant's confirmation
/// copy of `application_submitted` is not shadowed by the owner's copy.
pub fn idempotency_key(
    source: &EventSource,
    kind: NotificationKind,
    recipient: ActorId,
) -> String {
    format!(
        "{}:{}:{}:{}",
        source.source_type(),
        source.source_uuid(),
        kind.as_str(),
        recipient
    )
}

/// One notification delivery record.
///
/// Created exactly once per `(recipient, transition)`; mutated only to set
/// `read_at`; retained indefinitely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Who this delivery record is for.
    pub recipient_id: ActorId,
    /// The entity whose transition is being reported.
    pub source: EventSource,
    /// Which transition occurred.
    pub kind: NotificationKind,
    /// Deduplication key — see [`idempotency_key`].
    pub idempotency_key: String,
    /// When the recipient read it; `None` until read.
    pub read_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Materialize the delivery record for one recipient of an event.
    pub fn for_recipient(
        event: &TransitionEvent,
        recipient: ActorId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient_id: recipient,
            source: event.source,
            kind: event.kind,
            idempotency_key: idempotency_key(&event.source, event.kind, recipient),
            read_at: None,
            created_at: now,
        }
    }

    /// Mark read. Idempotent: an already-read record is left untouched
    /// and `false` is returned.
    pub fn mark_read(&mut self, now: DateTime<Utc>) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(now);
        true
    }
}
