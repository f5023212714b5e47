//! # Payment Ledger
//!
//! One money obligation (rent period or security deposit) tied to a lease.
//!
//! ## States
//!
//! ```text
//! Pending ──▶ Paid ──▶ Verified (terminal)
//!    │          ▲
//!    ▼          │
//! Overdue ──────┘
//! ```
//!
//! ## The claim/verify split
//!
//! `mark_paid` is a tenant **claim** — it records that the tenant says the
//! money moved, nothing more. `verify` is the landlord's authoritative
//! confirmation and the only path to `Verified`. The two live at different
//! trust levels and no single actor holds both capabilities, so an unpaid
//! obligation can never be settled unilaterally. `verify` on a `Pending`
//! or `Overdue` record is a hard error, not a shortcut.
//!
//! ## Idempotency
//!
//! Retried requests are expected. A repeat `mark_paid` on a `Paid` record
//! and a repeat `verify` on a `Verified` record are no-ops that emit no
//! event; a `mark_paid` on a `Verified` record is a hard
//! [`PaymentError::InvalidTransition`] because the claim would reopen a
//! settled obligation. The overdue sweep is idempotent per record.
//!
//! Obligations are never deleted and their `amount` never changes after
//! creation — the ledger is an audit artifact.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use haven_core::{Actor, ActorId, LeaseId, Money, PaymentId, Role};

use crate::authz::{self, Transition};
use crate::event::{EventSource, NotificationKind, TransitionEvent};
use crate::lease::Lease;
use crate::transition::TransitionRecord;

// ─── Kind & status ───────────────────────────────────────────────────

/// What a payment obligation is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// One rent billing period.
    Rent,
    /// The one-time security deposit.
    SecurityDeposit,
}

impl PaymentKind {
    /// The canonical wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::SecurityDeposit => "security_deposit",
        }
    }
}

impl std::fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The settlement status of a payment obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, not yet claimed paid.
    Pending,
    /// The tenant claims the money moved. A claim, not proof.
    Paid,
    /// The due date elapsed with no claim.
    Overdue,
    /// The landlord confirmed receipt. Terminal and irreversible.
    Verified,
}

impl PaymentStatus {
    /// The canonical wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Verified => "verified",
        }
    }

    /// Position along the settlement order. Transitions may only move to
    /// an equal-or-higher rank; the monotonicity tests lean on this.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Overdue => 1,
            Self::Paid => 2,
            Self::Verified => 3,
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by payment operations.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// The caller's role lacks the capability for this transition.
    #[error("role {role} may not move a payment from {from} to {to}")]
    Forbidden {
        /// The caller's role.
        role: Role,
        /// Current status.
        from: PaymentStatus,
        /// Requested status.
        to: PaymentStatus,
    },

    /// The status precondition does not hold.
    #[error("invalid payment transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: PaymentStatus,
        /// Requested status.
        to: PaymentStatus,
    },

    /// The caller is not the tenant on this payment's lease.
    #[error("caller is not a party to payment {id}")]
    NotParty {
        /// The payment in question.
        id: PaymentId,
    },
}

// ─── Payment ─────────────────────────────────────────────────────────

/// One money obligation tied to a lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique payment identifier.
    pub id: PaymentId,
    /// The lease this obligation belongs to.
    pub lease_id: LeaseId,
    /// What the obligation is for.
    pub kind: PaymentKind,
    /// The amount due — snapshotted from the lease terms at creation and
    /// immutable afterwards.
    pub amount: Money,
    /// When the obligation falls due.
    pub due_date: NaiveDate,
    /// Current settlement status.
    pub status: PaymentStatus,
    /// Short receipt-lookup reference shown on both dashboards.
    pub reference: String,
    /// When the tenant claimed payment.
    pub paid_at: Option<DateTime<Utc>>,
    /// When the landlord verified.
    pub verified_at: Option<DateTime<Utc>>,
    /// Who verified.
    pub verified_by: Option<ActorId>,
    /// Ordered log of all status changes.
    pub transitions: Vec<TransitionRecord<PaymentStatus>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Materialize an obligation against a lease.
    ///
    /// Crate-internal by design: only the lease flow (deposit at
    /// acceptance, first rent at full signature) and the billing sweep
    /// create obligations, and both snapshot the amount from the lease
    /// terms here. There is no path that accepts a caller-supplied amount.
    pub(crate) fn obligation(
        lease: &Lease,
        kind: PaymentKind,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let amount = match kind {
            PaymentKind::Rent => lease.terms.monthly_rent,
            PaymentKind::SecurityDeposit => lease.terms.security_deposit,
        };
        let id = PaymentId::new();
        let reference = Self::reference_for(&id);
        Self {
            id,
            lease_id: lease.id,
            kind,
            amount,
            due_date,
            status: PaymentStatus::Pending,
            reference,
            paid_at: None,
            verified_at: None,
            verified_by: None,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The security deposit, due at lease acceptance.
    pub fn deposit_for(lease: &Lease, now: DateTime<Utc>) -> Self {
        Self::obligation(lease, PaymentKind::SecurityDeposit, lease.terms.start_date, now)
    }

    /// A rent obligation for the period falling due on `due_date`.
    pub fn rent_for(lease: &Lease, due_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self::obligation(lease, PaymentKind::Rent, due_date, now)
    }

    /// Tenant claim: "I paid this."
    ///
    /// Legal from `Pending` and `Overdue`. Releases nothing — the claim
    /// awaits [`Payment::verify`]. Returns `Ok(None)` on a retried claim
    /// against an already-`Paid` record.
    pub fn mark_paid(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Option<TransitionEvent>, PaymentError> {
        match self.status {
            PaymentStatus::Paid => return Ok(None),
            PaymentStatus::Verified => {
                return Err(PaymentError::InvalidTransition {
                    from: self.status,
                    to: PaymentStatus::Paid,
                })
            }
            PaymentStatus::Pending | PaymentStatus::Overdue => {}
        }
        let transition = Transition::Payment {
            from: self.status,
            to: PaymentStatus::Paid,
        };
        if !authz::allows(actor.role, &transition) {
            return Err(PaymentError::Forbidden {
                role: actor.role,
                from: self.status,
                to: PaymentStatus::Paid,
            });
        }
        self.apply(PaymentStatus::Paid, now, Some(actor.id));
        self.paid_at = Some(now);
        Ok(Some(TransitionEvent::by_actor(
            EventSource::Payment(self.id),
            NotificationKind::PaymentMarkedPaid,
            actor.id,
        )))
    }

    /// Landlord confirmation: the authoritative, terminal settlement.
    ///
    /// Legal only from `Paid` — verifying an unclaimed obligation would
    /// let a deposit be marked settled without the tenant ever claiming
    /// payment. Returns `Ok(None)` on a retried verify.
    pub fn verify(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Option<TransitionEvent>, PaymentError> {
        match self.status {
            PaymentStatus::Verified => return Ok(None),
            PaymentStatus::Paid => {}
            PaymentStatus::Pending | PaymentStatus::Overdue => {
                return Err(PaymentError::InvalidTransition {
                    from: self.status,
                    to: PaymentStatus::Verified,
                })
            }
        }
        let transition = Transition::Payment {
            from: self.status,
            to: PaymentStatus::Verified,
        };
        if !authz::allows(actor.role, &transition) {
            return Err(PaymentError::Forbidden {
                role: actor.role,
                from: self.status,
                to: PaymentStatus::Verified,
            });
        }
        self.apply(PaymentStatus::Verified, now, Some(actor.id));
        self.verified_at = Some(now);
        self.verified_by = Some(actor.id);
        Ok(Some(TransitionEvent::by_actor(
            EventSource::Payment(self.id),
            NotificationKind::PaymentVerified,
            actor.id,
        )))
    }

    /// Sweep transition: `Pending → Overdue` once the due date has passed.
    ///
    /// Not actor-triggered and not in the capability table. Idempotent —
    /// already-overdue, claimed, and settled records return `None`.
    pub fn mark_overdue(&mut self, today: NaiveDate, now: DateTime<Utc>) -> Option<TransitionEvent> {
        if self.status != PaymentStatus::Pending || self.due_date >= today {
            return None;
        }
        self.apply(PaymentStatus::Overdue, now, None);
        Some(TransitionEvent::by_system(
            EventSource::Payment(self.id),
            NotificationKind::PaymentOverdue,
        ))
    }

    fn apply(&mut self, to: PaymentStatus, now: DateTime<Utc>, actor: Option<ActorId>) {
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

    /// Receipt reference: short, human-quotable, derived from the id.
    fn reference_for(id: &PaymentId) -> String {
        let simple = id.as_uuid().simple().to_string();
        format!("PMT-{}", &simple[..8].to_uppercase())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{Application, ApplicationDraft, ApplicationStatus};
    use crate::lease::{Lease, LeaseTerms};
    use haven_core::{ActorId, PropertyId};

    fn lease() -> (Lease, Actor, Actor) {
        let draft = ApplicationDraft {
            property_id: PropertyId::new(),
            applicant_id: ActorId::new(),
            landlord_id: ActorId::new(),
            agent_id: None,
            step: 4,
            personal_info: serde_json::json!({"name": "T"}),
            employment: serde_json::json!({"employer": "E"}),
            references: serde_json::json!([{"name": "R"}]),
            disclosures: serde_json::json!({"pets": false}),
            terms: LeaseTerms {
                monthly_rent: Money::from_cents(120_000),
                security_deposit: Money::from_cents(240_000),
                rent_due_day: 5,
                start_date: chrono::NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
                end_date: chrono::NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
            },
        };
        let tenant = Actor::new(draft.applicant_id, Role::Tenant);
        let landlord = Actor::new(draft.landlord_id, Role::Landlord);
        let (mut app, _) = Application::submit(draft, Utc::now()).unwrap();
        app.advance(ApplicationStatus::UnderReview, &landlord, None, Utc::now())
            .unwrap();
        app.advance(ApplicationStatus::Approved, &landlord, None, Utc::now())
            .unwrap();
        let (lease, _) = Lease::initialize(&app, true, Utc::now()).unwrap();
        (lease, tenant, landlord)
    }

    fn pending_rent() -> (Payment, Actor, Actor) {
        let (lease, tenant, landlord) = lease();
        let due = lease.terms.start_date;
        (Payment::rent_for(&lease, due, Utc::now()), tenant, landlord)
    }

    // ── Amount snapshot ──────────────────────────────────────────────

    #[test]
    fn test_rent_snapshots_monthly_rent() {
        let (payment, _, _) = pending_rent();
        assert_eq!(payment.amount, Money::from_cents(120_000));
        assert_eq!(payment.kind, PaymentKind::Rent);
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_deposit_snapshots_security_deposit() {
        let (lease, _, _) = lease();
        let deposit = Payment::deposit_for(&lease, Utc::now());
        assert_eq!(deposit.amount, Money::from_cents(240_000));
        assert_eq!(deposit.kind, PaymentKind::SecurityDeposit);
    }

    #[test]
    fn test_reference_is_quotable() {
        let (payment, _, _) = pending_rent();
        assert!(payment.reference.starts_with("PMT-"));
        assert_eq!(payment.reference.len(), 12);
    }

    // ── Claim ────────────────────────────────────────────────────────

    #[test]
    fn test_tenant_marks_paid() {
        let (mut payment, tenant, _) = pending_rent();
        let event = payment.mark_paid(&tenant, Utc::now()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert!(payment.paid_at.is_some());
        assert_eq!(
            event.map(|e| e.kind),
            Some(NotificationKind::PaymentMarkedPaid)
        );
    }

    #[test]
    fn test_repeat_claim_is_noop() {
        let (mut payment, tenant, _) = pending_rent();
        payment.mark_paid(&tenant, Utc::now()).unwrap();
        let first_paid_at = payment.paid_at;
        let retry = payment.mark_paid(&tenant, Utc::now()).unwrap();
        assert!(retry.is_none(), "retried claim must emit no event");
        assert_eq!(payment.paid_at, first_paid_at);
        assert_eq!(payment.transitions.len(), 1);
    }

    #[test]
    fn test_landlord_cannot_claim() {
        let (mut payment, _, landlord) = pending_rent();
        let err = payment.mark_paid(&landlord, Utc::now()).unwrap_err();
        assert!(matches!(err, PaymentError::Forbidden { .. }));
    }

    #[test]
    fn test_claim_from_overdue() {
        let (mut payment, tenant, _) = pending_rent();
        let after_due = payment.due_date + chrono::Days::new(3);
        payment.mark_overdue(after_due, Utc::now()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Overdue);
        payment.mark_paid(&tenant, Utc::now()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
    }

    // ── Verify ───────────────────────────────────────────────────────

    #[test]
    fn test_landlord_verifies_claimed_payment() {
        let (mut payment, tenant, landlord) = pending_rent();
        payment.mark_paid(&tenant, Utc::now()).unwrap();
        let event = payment.verify(&landlord, Utc::now()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Verified);
        assert_eq!(payment.verified_by, Some(landlord.id));
        assert_eq!(event.map(|e| e.kind), Some(NotificationKind::PaymentVerified));
    }

    #[test]
    fn test_verify_from_pending_is_rejected() {
        // The load-bearing invariant: an unclaimed obligation can never be
        // settled, even by the landlord.
        let (mut payment, _, landlord) = pending_rent();
        let err = payment.verify(&landlord, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            PaymentError::InvalidTransition {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Verified,
            }
        ));
    }

    #[test]
    fn test_verify_from_overdue_is_rejected() {
        let (mut payment, _, landlord) = pending_rent();
        let after_due = payment.due_date + chrono::Days::new(1);
        payment.mark_overdue(after_due, Utc::now());
        assert!(payment.verify(&landlord, Utc::now()).is_err());
    }

    #[test]
    fn test_tenant_cannot_verify() {
        let (mut payment, tenant, _) = pending_rent();
        payment.mark_paid(&tenant, Utc::now()).unwrap();
        let err = payment.verify(&tenant, Utc::now()).unwrap_err();
        assert!(matches!(err, PaymentError::Forbidden { .. }));
    }

    #[test]
    fn test_agent_cannot_verify() {
        let (mut payment, tenant, _) = pending_rent();
        payment.mark_paid(&tenant, Utc::now()).unwrap();
        let agent = Actor::new(ActorId::new(), Role::Agent);
        assert!(matches!(
            payment.verify(&agent, Utc::now()).unwrap_err(),
            PaymentError::Forbidden { .. }
        ));
    }

    #[test]
    fn test_admin_may_verify() {
        let (mut payment, tenant, _) = pending_rent();
        payment.mark_paid(&tenant, Utc::now()).unwrap();
        let admin = Actor::new(ActorId::new(), Role::Admin);
        payment.verify(&admin, Utc::now()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Verified);
    }

    #[test]
    fn test_verified_is_terminal() {
        let (mut payment, tenant, landlord) = pending_rent();
        payment.mark_paid(&tenant, Utc::now()).unwrap();
        payment.verify(&landlord, Utc::now()).unwrap();

        // Retried verify: no-op.
        assert!(payment.verify(&landlord, Utc::now()).unwrap().is_none());
        // Claim against a settled record: hard error.
        let err = payment.mark_paid(&tenant, Utc::now()).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidTransition { .. }));
        // Sweep cannot touch it either.
        let far_future = payment.due_date + chrono::Days::new(365);
        assert!(payment.mark_overdue(far_future, Utc::now()).is_none());
    }

    // ── Overdue sweep ────────────────────────────────────────────────

    #[test]
    fn test_sweep_marks_overdue_after_due_date() {
        let (mut payment, _, _) = pending_rent();
        let event = payment
            .mark_overdue(payment.due_date + chrono::Days::new(1), Utc::now())
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Overdue);
        assert_eq!(event.kind, NotificationKind::PaymentOverdue);
        assert!(event.actor.is_none());
    }

    #[test]
    fn test_sweep_spares_records_on_or_before_due_date() {
        let (mut payment, _, _) = pending_rent();
        assert!(payment.mark_overdue(payment.due_date, Utc::now()).is_none());
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_repeat_sweep_is_noop() {
        let (mut payment, _, _) = pending_rent();
        let after_due = payment.due_date + chrono::Days::new(1);
        assert!(payment.mark_overdue(after_due, Utc::now()).is_some());
        assert!(payment.mark_overdue(after_due, Utc::now()).is_none());
        assert_eq!(payment.transitions.len(), 1);
    }

    // ── Monotonicity ─────────────────────────────────────────────────

    #[test]
    fn test_status_rank_never_regresses() {
        let (mut payment, tenant, landlord) = pending_rent();
        let mut ranks = vec![payment.status.rank()];
        payment
            .mark_overdue(payment.due_date + chrono::Days::new(1), Utc::now());
        ranks.push(payment.status.rank());
        payment.mark_paid(&tenant, Utc::now()).unwrap();
        ranks.push(payment.status.rank());
        payment.verify(&landlord, Utc::now()).unwrap();
        ranks.push(payment.status.rank());
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "ranks: {ranks:?}");
    }

    #[test]
    fn test_amount_immutable_across_transitions() {
        let (mut payment, tenant, landlord) = pending_rent();
        let amount = payment.amount;
        payment.mark_overdue(payment.due_date + chrono::Days::new(1), Utc::now());
        payment.mark_paid(&tenant, Utc::now()).unwrap();
        payment.verify(&landlord, Utc::now()).unwrap();
        assert_eq!(payment.amount, amount);
    }
}
