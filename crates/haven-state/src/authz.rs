//! # Role Capability Table
//!
//! The full role-gated transition surface of the platform as one static
//! data table. The guard is a membership test — there is no branching
//! authorization code anywhere else, and absence means denial. The table
//! is deliberately flat so a reviewer can audit every
//! `(role, from, to)` grant in one screen and the tests can sweep the
//! whole matrix.
//!
//! System transitions (the overdue sweep) are not actor-initiated and do
//! not appear here.

use haven_core::Role;

use crate::application::ApplicationStatus;
use crate::lease::LeaseStatus;
use crate::payment::PaymentStatus;

/// One guarded status edge on one of the three entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// An application review edge.
    Application {
        /// Current status.
        from: ApplicationStatus,
        /// Requested status.
        to: ApplicationStatus,
    },
    /// A lease execution edge.
    Lease {
        /// Current status.
        from: LeaseStatus,
        /// Requested status.
        to: LeaseStatus,
    },
    /// A payment settlement edge.
    Payment {
        /// Current status.
        from: PaymentStatus,
        /// Requested status.
        to: PaymentStatus,
    },
}

use haven_core::Role::{Admin, Agent, Landlord, Tenant};

type A = ApplicationStatus;
type L = LeaseStatus;
type P = PaymentStatus;

macro_rules! app {
    ($role:expr, $from:expr => $to:expr) => {
        ($role, Transition::Application { from: $from, to: $to })
    };
}
macro_rules! lease {
    ($role:expr, $from:expr => $to:expr) => {
        ($role, Transition::Lease { from: $from, to: $to })
    };
}
macro_rules! pay {
    ($role:expr, $from:expr => $to:expr) => {
        ($role, Transition::Payment { from: $from, to: $to })
    };
}

/// Every allowed `(role, transition)` pair. Everything else is denied.
pub const CAPABILITIES: &[(Role, Transition)] = &[
    // ── Application review ───────────────────────────────────────────
    // Only the applicant submits; only the owner side moves past
    // Submitted; only platform admin reopens a rejection.
    app!(Tenant, A::Draft => A::Submitted),
    app!(Landlord, A::Submitted => A::UnderReview),
    app!(Agent, A::Submitted => A::UnderReview),
    app!(Admin, A::Submitted => A::UnderReview),
    app!(Landlord, A::UnderReview => A::InfoRequested),
    app!(Agent, A::UnderReview => A::InfoRequested),
    app!(Admin, A::UnderReview => A::InfoRequested),
    app!(Landlord, A::InfoRequested => A::UnderReview),
    app!(Agent, A::InfoRequested => A::UnderReview),
    app!(Admin, A::InfoRequested => A::UnderReview),
    app!(Landlord, A::UnderReview => A::BackgroundCheck),
    app!(Agent, A::UnderReview => A::BackgroundCheck),
    app!(Admin, A::UnderReview => A::BackgroundCheck),
    app!(Landlord, A::UnderReview => A::Approved),
    app!(Agent, A::UnderReview => A::Approved),
    app!(Admin, A::UnderReview => A::Approved),
    app!(Landlord, A::UnderReview => A::ConditionalApproval),
    app!(Agent, A::UnderReview => A::ConditionalApproval),
    app!(Admin, A::UnderReview => A::ConditionalApproval),
    app!(Landlord, A::UnderReview => A::Rejected),
    app!(Agent, A::UnderReview => A::Rejected),
    app!(Admin, A::UnderReview => A::Rejected),
    app!(Landlord, A::BackgroundCheck => A::Approved),
    app!(Agent, A::BackgroundCheck => A::Approved),
    app!(Admin, A::BackgroundCheck => A::Approved),
    app!(Landlord, A::BackgroundCheck => A::ConditionalApproval),
    app!(Agent, A::BackgroundCheck => A::ConditionalApproval),
    app!(Admin, A::BackgroundCheck => A::ConditionalApproval),
    app!(Landlord, A::BackgroundCheck => A::Rejected),
    app!(Agent, A::BackgroundCheck => A::Rejected),
    app!(Admin, A::BackgroundCheck => A::Rejected),
    app!(Admin, A::Rejected => A::UnderReview),
    // ── Lease execution ──────────────────────────────────────────────
    // The owner side sends; only the tenant accepts; both parties sign
    // (the completing signature fires the edge); the owner side
    // schedules move-in.
    lease!(Landlord, L::Draft => L::LeaseSent),
    lease!(Agent, L::Draft => L::LeaseSent),
    lease!(Admin, L::Draft => L::LeaseSent),
    lease!(Tenant, L::LeaseSent => L::LeaseAccepted),
    lease!(Tenant, L::LeaseAccepted => L::LeaseSigned),
    lease!(Landlord, L::LeaseAccepted => L::LeaseSigned),
    lease!(Agent, L::LeaseAccepted => L::LeaseSigned),
    lease!(Landlord, L::LeaseSigned => L::MoveInReady),
    lease!(Agent, L::LeaseSigned => L::MoveInReady),
    lease!(Admin, L::LeaseSigned => L::MoveInReady),
    // ── Payment settlement ───────────────────────────────────────────
    // The claim/verify split: the tenant claims, the landlord (or
    // platform admin) confirms. Neither set overlaps, so no single
    // actor can reach Verified alone. Agents handle paperwork, not
    // money — no payment capability.
    pay!(Tenant, P::Pending => P::Paid),
    pay!(Tenant, P::Overdue => P::Paid),
    pay!(Landlord, P::Paid => P::Verified),
    pay!(Admin, P::Paid => P::Verified),
];

/// Whether `role` holds the capability for `transition`.
///
/// Pure membership test over [`CAPABILITIES`]; default-deny.
pub fn allows(role: Role, transition: &Transition) -> bool {
    CAPABILITIES
        .iter()
        .any(|(r, t)| *r == role && t == transition)
}

// ─── Tests ───────────────────────────────────────────────────────────
