//! # haven-state — Tenancy Lifecycle State Machines
//!
//! The domain core of the Haven platform: three correlated state machines
//! (application review, lease execution, payment ledger) plus the role
//! capability table that gates every transition and the event types their
//! transitions emit.
//!
//! ## Components
//!
//! - [`application`] — application review machine
//!   (`submitted → under_review → … → approved/rejected`).
//! - [`lease`] — lease execution machine
//!   (`lease_sent → lease_accepted → lease_signed → move_in_ready`) with
//!   a two-slot co-signature gate.
//! - [`payment`] — the payment ledger's claim/verify split
//!   (`pending → paid → verified`, with the overdue sweep branch).
//! - [`authz`] — the static `(role, transition)` capability table.
//!   Default-deny: a pair not in the table is forbidden.
//! - [`event`] — transition events, notification routing, and
//!   per-recipient idempotency keys.
//!
//! ## Design Decision
//!
//! Each machine is an enum with a `successors()` data function and methods
//! returning `Result`, not a typestate encoding. The transition surfaces are
//! small, but three of them interlock (approval creates the lease, signature
//! materializes payments) and every transition must also be role-checked
//! against [`authz::CAPABILITIES`] — a runtime table both the guard and the
//! audit tests read. Scattering the graph across typestate impls would hide
//! the one thing this subsystem exists to make reviewable.
//!
//! ## Crate Policy
//!
//! - Pure domain logic: no I/O, no async, no clocks — callers pass `now`.
//! - Errors are structured `thiserror` enums; nothing is swallowed.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod application;
pub mod authz;
pub mod event;
pub mod lease;
pub mod payment;
pub mod transition;

pub use application::{Application, ApplicationDraft, ApplicationError, ApplicationStatus};
pub use authz::{allows, Transition, CAPABILITIES};
pub use event::{
    EventSource, Notification, NotificationKind, Parties, TransitionEvent,
};
pub use lease::{Lease, LeaseError, LeaseStatus, LeaseTerms, SignerSide};
pub use payment::{Payment, PaymentError, PaymentKind, PaymentStatus};
pub use transition::TransitionRecord;
