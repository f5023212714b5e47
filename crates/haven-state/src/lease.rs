//! # Lease Execution State Machine
//!
//! The binding agreement derived from one approved application.
//!
//! ## States
//!
//! ```text
//! Draft ──▶ LeaseSent ──▶ LeaseAccepted ──▶ LeaseSigned ──▶ MoveInReady
//! ```
//!
//! `Draft` covers a lease prepared offline and not yet sent to the
//! applicant; leases initialized for immediate sending start at
//! `LeaseSent`. A lease record cannot exist at all until its application
//! reaches an approved terminal state — [`Lease::initialize`] enforces
//! the precondition, the store's one-lease-per-application index enforces
//! uniqueness.
//!
//! ## Co-signature
//!
//! `LeaseAccepted → LeaseSigned` is gated on two independent signature
//! slots, one per side. A signature call records the caller's slot and
//! only fires the transition once both are present; a partial signature
//! changes no status and emits no event. Re-signing an already-held slot
//! is an idempotent no-op, so a retried signature request cannot
//! double-emit `lease_signed`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use haven_core::{Actor, ActorId, ApplicationId, LeaseId, Money, PropertyId, Role, ValidationError};

use crate::application::{Application, ApplicationStatus};
use crate::authz::{self, Transition};
use crate::event::{EventSource, NotificationKind, Parties, TransitionEvent};
use crate::transition::TransitionRecord;

// ─── Status ──────────────────────────────────────────────────────────

/// The execution status of a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    /// Drafted by the owner side, not yet sent to the applicant.
    Draft,
    /// Sent to the applicant for acceptance.
    LeaseSent,
    /// Accepted by the tenant; awaiting signatures.
    LeaseAccepted,
    /// Fully co-signed by both parties.
    LeaseSigned,
    /// Move-in scheduled; tenancy begins on the move-in date.
    MoveInReady,
}

impl LeaseStatus {
    /// The canonical wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::LeaseSent => "lease_sent",
            Self::LeaseAccepted => "lease_accepted",
            Self::LeaseSigned => "lease_signed",
            Self::MoveInReady => "move_in_ready",
        }
    }

    /// The direct successors of this status.
    pub fn successors(&self) -> &'static [LeaseStatus] {
        match self {
            Self::Draft => &[Self::LeaseSent],
            Self::LeaseSent => &[Self::LeaseAccepted],
            Self::LeaseAccepted => &[Self::LeaseSigned],
            Self::LeaseSigned => &[Self::MoveInReady],
            Self::MoveInReady => &[],
        }
    }
}

impl std::fmt::Display for LeaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Terms ───────────────────────────────────────────────────────────

/// The financial terms of a lease, snapshotted from the listing when the
/// application is created and frozen once the lease exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseTerms {
    /// Monthly rent.
    pub monthly_rent: Money,
    /// Security deposit, due at acceptance.
    pub security_deposit: Money,
    /// Day of month rent falls due (1..=28).
    pub rent_due_day: u8,
    /// First day of the tenancy.
    pub start_date: NaiveDate,
    /// Last day of the tenancy.
    pub end_date: NaiveDate,
}

impl LeaseTerms {
    /// Validate amounts and dates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.monthly_rent.require_positive("monthly_rent")?;
        self.security_deposit.require_positive("security_deposit")?;
        if !(1..=28).contains(&self.rent_due_day) {
            return Err(ValidationError::InvalidDueDay {
                day: self.rent_due_day,
            });
        }
        if self.end_date <= self.start_date {
            return Err(ValidationError::EmptyDateRange { field: "lease term" });
        }
        Ok(())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by lease operations.
#[derive(Error, Debug)]
pub enum LeaseError {
    /// Malformed or missing input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Lease creation attempted before the application was approved.
    #[error("cannot create a lease for an application in status {status}")]
    NotApproved {
        /// The application's current status.
        status: ApplicationStatus,
    },

    /// The caller's role lacks the capability for a graph-legal edge.
    #[error("role {role} may not move a lease from {from} to {to}")]
    Forbidden {
        /// The caller's role.
        role: Role,
        /// Current status.
        from: LeaseStatus,
        /// Requested status.
        to: LeaseStatus,
    },

    /// The requested status is not a successor of the current status.
    #[error("invalid lease transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: LeaseStatus,
        /// Requested status.
        to: LeaseStatus,
    },

    /// The caller is not a party to this lease.
    #[error("caller is not a party to lease {id}")]
    NotParty {
        /// The lease in question.
        id: LeaseId,
    },
}

// ─── Signature slots ─────────────────────────────────────────────────

/// Which side of the lease a signature lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerSide {
    /// The tenant's slot.
    Tenant,
    /// The owner's slot — signed by the landlord or the listing agent.
    Owner,
}

impl SignerSide {
    /// The slot a role signs into, if the role signs at all.
    pub fn from_role(role: Role) -> Option<SignerSide> {
        match role {
            Role::Tenant => Some(Self::Tenant),
            Role::Landlord | Role::Agent => Some(Self::Owner),
            Role::Admin => None,
        }
    }
}

/// The result of one signature call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutcome {
    /// Whether this call newly recorded a signature (false on a retried
    /// call whose slot was already held).
    pub recorded: bool,
    /// Whether both slots are now held and the lease advanced to
    /// `LeaseSigned`. The first rent obligation is materialized exactly
    /// when this flips true.
    pub fully_signed: bool,
    /// The `lease_signed` event, present only on the completing call.
    pub event: Option<TransitionEvent>,
}

// ─── Lease ───────────────────────────────────────────────────────────

/// The binding agreement derived from one approved application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    /// Unique lease identifier.
    pub id: LeaseId,
    /// The application this lease was derived from (1:1).
    pub application_id: ApplicationId,
    /// The leased property.
    pub property_id: PropertyId,
    /// The tenant.
    pub tenant_id: ActorId,
    /// The property owner or manager.
    pub landlord_id: ActorId,
    /// The listing agent, when one is assigned.
    pub agent_id: Option<ActorId>,
    /// Current execution status.
    pub status: LeaseStatus,
    /// Financial terms, frozen at creation.
    pub terms: LeaseTerms,
    /// Scheduled move-in date; set by [`Lease::schedule_move_in`].
    pub move_in_date: Option<NaiveDate>,
    /// When the tenant signed, if they have.
    pub tenant_signed_at: Option<DateTime<Utc>>,
    /// When the owner side signed, if it has.
    pub landlord_signed_at: Option<DateTime<Utc>>,
    /// Ordered log of all status changes.
    pub transitions: Vec<TransitionRecord<LeaseStatus>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Lease {
    /// Derive a lease from an approved application.
    ///
    /// The caller (the application advance flow) is responsible for the
    /// once-only guarantee via the store's application index; this
    /// constructor enforces only the approval precondition. With
    /// `send_immediately` the lease starts at `LeaseSent` and emits
    /// `lease_sent`; otherwise it starts at `Draft` silently.
    pub fn initialize(
        application: &Application,
        send_immediately: bool,
        now: DateTime<Utc>,
    ) -> Result<(Self, Option<TransitionEvent>), LeaseError> {
        if !application.status.is_approved() {
            return Err(LeaseError::NotApproved {
                status: application.status,
            });
        }
        application.terms.validate()?;

        let status = if send_immediately {
            LeaseStatus::LeaseSent
        } else {
            LeaseStatus::Draft
        };
        let id = LeaseId::new();
        let mut lease = Self {
            id,
            application_id: application.id,
            property_id: application.property_id,
            tenant_id: application.applicant_id,
            landlord_id: application.landlord_id,
            agent_id: application.agent_id,
            status,
            terms: application.terms.clone(),
            move_in_date: None,
            tenant_signed_at: None,
            landlord_signed_at: None,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let event = if send_immediately {
            lease.transitions.push(TransitionRecord::by_system(
                LeaseStatus::Draft,
                LeaseStatus::LeaseSent,
                now,
            ));
            Some(TransitionEvent::by_system(
                EventSource::Lease(id),
                NotificationKind::LeaseSent,
            ))
        } else {
            None
        };
        Ok((lease, event))
    }

    /// Send a drafted lease to the applicant.
    pub fn send(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<TransitionEvent, LeaseError> {
        self.require_party(actor)?;
        self.check_transition(actor.role, LeaseStatus::LeaseSent)?;
        self.apply(LeaseStatus::LeaseSent, now, Some(actor.id));
        Ok(TransitionEvent::by_actor(
            EventSource::Lease(self.id),
            NotificationKind::LeaseSent,
            actor.id,
        ))
    }

    /// Tenant acceptance.
    ///
    /// On success the caller materializes the security-deposit payment.
    pub fn accept(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<TransitionEvent, LeaseError> {
        self.require_party(actor)?;
        self.check_transition(actor.role, LeaseStatus::LeaseAccepted)?;
        self.apply(LeaseStatus::LeaseAccepted, now, Some(actor.id));
        Ok(TransitionEvent::by_actor(
            EventSource::Lease(self.id),
            NotificationKind::LeaseAccepted,
            actor.id,
        ))
    }

    /// Record the caller's signature.
    ///
    /// The transition to `LeaseSigned` fires only on the call that fills
    /// the second slot; the first signature changes no status. A repeated
    /// signature on a held slot — including any signature call on an
    /// already-signed lease — is an idempotent no-op.
    pub fn sign(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<SignOutcome, LeaseError> {
        self.require_party(actor)?;

        let side = SignerSide::from_role(actor.role).ok_or(LeaseError::Forbidden {
            role: actor.role,
            from: self.status,
            to: LeaseStatus::LeaseSigned,
        })?;

        // Retried signature after full execution: nothing to do.
        if matches!(self.status, LeaseStatus::LeaseSigned | LeaseStatus::MoveInReady) {
            let already_held = match side {
                SignerSide::Tenant => self.tenant_signed_at.is_some(),
                SignerSide::Owner => self.landlord_signed_at.is_some(),
            };
            if already_held {
                return Ok(SignOutcome {
                    recorded: false,
                    fully_signed: false,
                    event: None,
                });
            }
        }

        // A signature is only legal while the lease sits at LeaseAccepted.
        self.check_transition(actor.role, LeaseStatus::LeaseSigned)?;

        let slot = match side {
            SignerSide::Tenant => &mut self.tenant_signed_at,
            SignerSide::Owner => &mut self.landlord_signed_at,
        };
        if slot.is_some() {
            // Same side signing twice while the co-signer is pending.
            return Ok(SignOutcome {
                recorded: false,
                fully_signed: false,
                event: None,
            });
        }
        *slot = Some(now);
        self.updated_at = now;

        if self.tenant_signed_at.is_some() && self.landlord_signed_at.is_some() {
            self.apply(LeaseStatus::LeaseSigned, now, Some(actor.id));
            return Ok(SignOutcome {
                recorded: true,
                fully_signed: true,
                event: Some(TransitionEvent::by_actor(
                    EventSource::Lease(self.id),
                    NotificationKind::LeaseSigned,
                    actor.id,
                )),
            });
        }
        Ok(SignOutcome {
            recorded: true,
            fully_signed: false,
            event: None,
        })
    }

    /// Schedule the move-in date.
    ///
    /// Requires a fully signed lease and a date on or after the lease
    /// start date.
    pub fn schedule_move_in(
        &mut self,
        move_in_date: NaiveDate,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<TransitionEvent, LeaseError> {
        self.require_party(actor)?;
        self.check_transition(actor.role, LeaseStatus::MoveInReady)?;
        if move_in_date < self.terms.start_date {
            return Err(ValidationError::DateBeforeBound {
                field: "move_in_date",
                bound: "lease start date",
            }
            .into());
        }
        self.move_in_date = Some(move_in_date);
        self.apply(LeaseStatus::MoveInReady, now, Some(actor.id));
        Ok(TransitionEvent::by_actor(
            EventSource::Lease(self.id),
            NotificationKind::MoveInScheduled,
            actor.id,
        ))
    }

    /// The tenancy parties for event routing.
    pub fn parties(&self) -> Parties {
        Parties {
            tenant: self.tenant_id,
            landlord: self.landlord_id,
            agent: self.agent_id,
        }
    }

    fn check_transition(&self, role: Role, target: LeaseStatus) -> Result<(), LeaseError> {
        let from = self.status;
        if !from.successors().contains(&target) {
            return Err(LeaseError::InvalidTransition { from, to: target });
        }
        if !authz::allows(role, &Transition::Lease { from, to: target }) {
            return Err(LeaseError::Forbidden {
                role,
                from,
                to: target,
            });
        }
        Ok(())
    }

    /// Reject callers who are not the tenant, landlord, or assigned agent.
    ///
    /// Admins act platform-wide and bypass the party check; their
    /// capabilities are still bounded by the authorization table.
    fn require_party(&self, actor: &Actor) -> Result<(), LeaseError> {
        let is_party = match actor.role {
            Role::Tenant => actor.id == self.tenant_id,
            Role::Landlord => actor.id == self.landlord_id,
            Role::Agent => self.agent_id == Some(actor.id),
            Role::Admin => true,
        };
        if !is_party {
            return Err(LeaseError::NotParty { id: self.id });
        }
        Ok(())
    }

    fn apply(&mut self, to: LeaseStatus, now: DateTime<Utc>, actor: Option<ActorId>) {
        self.transitions.push(TransitionRecord {
            from: self.status,
            to,
            at: now,
            actor,
            reason: None,
        });
        self.status = to;
        self.updated_at = now;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{Application, ApplicationDraft};
    use haven_core::Money;

    fn terms() -> LeaseTerms {
        LeaseTerms {
            monthly_rent: Money::from_cents(180_000),
            security_deposit: Money::from_cents(360_000),
            rent_due_day: 1,
            start_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
        }
    }

    fn approved_application() -> Application {
        let draft = ApplicationDraft {
            property_id: PropertyId::new(),
            applicant_id: ActorId::new(),
            landlord_id: ActorId::new(),
            agent_id: None,
            step: 4,
            personal_info: serde_json::json!({"name": "T"}),
            employment: serde_json::json!({"employer": "E"}),
            references: serde_json::json!([{"name": "R"}]),
            disclosures: serde_json::json!({"pets": true}),
            terms: terms(),
        };
        let landlord = Actor::new(draft.landlord_id, Role::Landlord);
        let (mut app, _) = Application::submit(draft, Utc::now()).unwrap();
        app.advance(ApplicationStatus::UnderReview, &landlord, None, Utc::now())
            .unwrap();
        app.advance(ApplicationStatus::Approved, &landlord, None, Utc::now())
            .unwrap();
        app
    }

    fn sent_lease() -> (Lease, Actor, Actor) {
        let app = approved_application();
        let tenant = Actor::new(app.applicant_id, Role::Tenant);
        let landlord = Actor::new(app.landlord_id, Role::Landlord);
        let (lease, event) = Lease::initialize(&app, true, Utc::now()).unwrap();
        assert!(event.is_some());
        (lease, tenant, landlord)
    }

    fn accepted_lease() -> (Lease, Actor, Actor) {
        let (mut lease, tenant, landlord) = sent_lease();
        lease.accept(&tenant, Utc::now()).unwrap();
        (lease, tenant, landlord)
    }

    // ── Initialization ───────────────────────────────────────────────

    #[test]
    fn test_initialize_requires_approval() {
        let draft = ApplicationDraft {
            property_id: PropertyId::new(),
            applicant_id: ActorId::new(),
            landlord_id: ActorId::new(),
            agent_id: None,
            step: 0,
            personal_info: serde_json::json!({"n": 1}),
            employment: serde_json::json!({"n": 1}),
            references: serde_json::json!({"n": 1}),
            disclosures: serde_json::json!({"n": 1}),
            terms: terms(),
        };
        let (app, _) = Application::submit(draft, Utc::now()).unwrap();
        let err = Lease::initialize(&app, true, Utc::now()).unwrap_err();
        assert!(matches!(err, LeaseError::NotApproved { .. }));
    }

    #[test]
    fn test_initialize_sent_emits_event() {
        let (lease, _, _) = sent_lease();
        assert_eq!(lease.status, LeaseStatus::LeaseSent);
        assert_eq!(lease.transitions.len(), 1);
    }

    #[test]
    fn test_initialize_draft_is_silent() {
        let app = approved_application();
        let (lease, event) = Lease::initialize(&app, false, Utc::now()).unwrap();
        assert_eq!(lease.status, LeaseStatus::Draft);
        assert!(event.is_none());
        assert!(lease.transitions.is_empty());
    }

    #[test]
    fn test_draft_lease_can_be_sent() {
        let app = approved_application();
        let landlord = Actor::new(app.landlord_id, Role::Landlord);
        let (mut lease, _) = Lease::initialize(&app, false, Utc::now()).unwrap();
        let event = lease.send(&landlord, Utc::now()).unwrap();
        assert_eq!(lease.status, LeaseStatus::LeaseSent);
        assert_eq!(event.kind, NotificationKind::LeaseSent);
    }

    // ── Acceptance ───────────────────────────────────────────────────

    #[test]
    fn test_tenant_accepts() {
        let (mut lease, tenant, _) = sent_lease();
        let event = lease.accept(&tenant, Utc::now()).unwrap();
        assert_eq!(lease.status, LeaseStatus::LeaseAccepted);
        assert_eq!(event.kind, NotificationKind::LeaseAccepted);
    }

    #[test]
    fn test_landlord_cannot_accept_for_tenant() {
        let (mut lease, _, landlord) = sent_lease();
        let err = lease.accept(&landlord, Utc::now()).unwrap_err();
        assert!(matches!(err, LeaseError::Forbidden { .. }));
    }

    #[test]
    fn test_foreign_tenant_cannot_accept() {
        let (mut lease, _, _) = sent_lease();
        let stranger = Actor::new(ActorId::new(), Role::Tenant);
        let err = lease.accept(&stranger, Utc::now()).unwrap_err();
        assert!(matches!(err, LeaseError::NotParty { .. }));
    }

    #[test]
    fn test_cannot_accept_twice() {
        let (mut lease, tenant, _) = accepted_lease();
        let err = lease.accept(&tenant, Utc::now()).unwrap_err();
        assert!(matches!(err, LeaseError::InvalidTransition { .. }));
    }

    // ── Co-signature ─────────────────────────────────────────────────

    #[test]
    fn test_partial_signature_holds_status() {
        let (mut lease, tenant, _) = accepted_lease();
        let outcome = lease.sign(&tenant, Utc::now()).unwrap();
        assert!(outcome.recorded);
        assert!(!outcome.fully_signed);
        assert!(outcome.event.is_none());
        assert_eq!(lease.status, LeaseStatus::LeaseAccepted);
        assert!(lease.tenant_signed_at.is_some());
        assert!(lease.landlord_signed_at.is_none());
    }

    #[test]
    fn test_second_signature_executes_lease() {
        let (mut lease, tenant, landlord) = accepted_lease();
        lease.sign(&tenant, Utc::now()).unwrap();
        let outcome = lease.sign(&landlord, Utc::now()).unwrap();
        assert!(outcome.fully_signed);
        assert_eq!(
            outcome.event.as_ref().map(|e| e.kind),
            Some(NotificationKind::LeaseSigned)
        );
        assert_eq!(lease.status, LeaseStatus::LeaseSigned);
    }

    #[test]
    fn test_same_side_re_sign_is_noop() {
        let (mut lease, tenant, _) = accepted_lease();
        lease.sign(&tenant, Utc::now()).unwrap();
        let retry = lease.sign(&tenant, Utc::now()).unwrap();
        assert!(!retry.recorded);
        assert!(retry.event.is_none());
        assert_eq!(lease.status, LeaseStatus::LeaseAccepted);
    }

    #[test]
    fn test_retried_sign_after_execution_is_noop() {
        let (mut lease, tenant, landlord) = accepted_lease();
        lease.sign(&tenant, Utc::now()).unwrap();
        lease.sign(&landlord, Utc::now()).unwrap();
        let retry = lease.sign(&landlord, Utc::now()).unwrap();
        assert!(!retry.recorded);
        assert!(retry.event.is_none());
        assert_eq!(lease.status, LeaseStatus::LeaseSigned);
    }

    #[test]
    fn test_cannot_sign_before_acceptance() {
        let (mut lease, tenant, _) = sent_lease();
        let err = lease.sign(&tenant, Utc::now()).unwrap_err();
        assert!(matches!(err, LeaseError::InvalidTransition { .. }));
    }

    #[test]
    fn test_agent_signs_owner_slot() {
        let mut app = approved_application();
        let agent_id = ActorId::new();
        app.agent_id = Some(agent_id);
        let tenant = Actor::new(app.applicant_id, Role::Tenant);
        let agent = Actor::new(agent_id, Role::Agent);
        let (mut lease, _) = Lease::initialize(&app, true, Utc::now()).unwrap();
        lease.accept(&tenant, Utc::now()).unwrap();
        lease.sign(&tenant, Utc::now()).unwrap();
        let outcome = lease.sign(&agent, Utc::now()).unwrap();
        assert!(outcome.fully_signed);
        assert!(lease.landlord_signed_at.is_some());
    }

    // ── Move-in ──────────────────────────────────────────────────────

    #[test]
    fn test_schedule_move_in() {
        let (mut lease, tenant, landlord) = accepted_lease();
        lease.sign(&tenant, Utc::now()).unwrap();
        lease.sign(&landlord, Utc::now()).unwrap();
        let event = lease
            .schedule_move_in(
                NaiveDate::from_ymd_opt(2025, 10, 4).unwrap(),
                &landlord,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(lease.status, LeaseStatus::MoveInReady);
        assert_eq!(event.kind, NotificationKind::MoveInScheduled);
        assert!(lease.move_in_date.is_some());
    }

    #[test]
    fn test_move_in_before_start_rejected() {
        let (mut lease, tenant, landlord) = accepted_lease();
        lease.sign(&tenant, Utc::now()).unwrap();
        lease.sign(&landlord, Utc::now()).unwrap();
        let err = lease
            .schedule_move_in(
                NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
                &landlord,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            LeaseError::Validation(ValidationError::DateBeforeBound { .. })
        ));
        assert_eq!(lease.status, LeaseStatus::LeaseSigned, "no partial write");
        assert!(lease.move_in_date.is_none());
    }

    #[test]
    fn test_move_in_requires_signed_lease() {
        let (mut lease, _, landlord) = accepted_lease();
        let err = lease
            .schedule_move_in(
                NaiveDate::from_ymd_opt(2025, 10, 4).unwrap(),
                &landlord,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, LeaseError::InvalidTransition { .. }));
    }

    // ── Terms validation ─────────────────────────────────────────────

    #[test]
    fn test_terms_reject_zero_rent() {
        let mut t = terms();
        t.monthly_rent = Money::ZERO;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_terms_reject_due_day_29() {
        let mut t = terms();
        t.rent_due_day = 29;
        assert!(matches!(
            t.validate().unwrap_err(),
            ValidationError::InvalidDueDay { day: 29 }
        ));
    }

    #[test]
    fn test_terms_reject_inverted_dates() {
        let mut t = terms();
        t.end_date = t.start_date;
        assert!(t.validate().is_err());
    }
}
