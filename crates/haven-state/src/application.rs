//! # Application Review State Machine
//!
//! Models one applicant's submission against one listed property.
//!
//! ## States
//!
//! ```text
//! Draft ──▶ Submitted ──▶ UnderReview ──▶ BackgroundCheck ─┐
//!                              │  ▲                        │
//!                              ▼  │                        ▼
//!                          InfoRequested        {Approved, ConditionalApproval, Rejected}
//!                              (loop)
//! ```
//!
//! `UnderReview` may also resolve directly to a terminal outcome; the
//! background check is at the reviewer's discretion. The only exit from a
//! terminal state is the admin-only reopen `Rejected → UnderReview`.
//!
//! ## Guarding
//!
//! Graph legality is checked first ([`ApplicationStatus::successors`]),
//! then role capability against [`crate::authz::CAPABILITIES`]. An illegal
//! edge is a 409-class [`ApplicationError::InvalidTransition`] regardless
//! of who asks; a legal edge the caller's role lacks is a 403-class
//! [`ApplicationError::Forbidden`].
//!
//! Applications are never deleted. The transition log is the audit trail;
//! a closed application stays queryable forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use haven_core::{Actor, ActorId, ApplicationId, PropertyId, Role, ValidationError};

use crate::authz::{self, Transition};
use crate::event::{EventSource, NotificationKind, TransitionEvent};
use crate::lease::LeaseTerms;
use crate::transition::TransitionRecord;

// ─── Status ──────────────────────────────────────────────────────────

/// The review status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Saved by the applicant mid-wizard; not yet visible to the owner.
    Draft,
    /// Submitted and awaiting review.
    Submitted,
    /// Under active review by the owner side.
    UnderReview,
    /// The reviewer asked the applicant for more information.
    InfoRequested,
    /// A background/credit check is in progress.
    BackgroundCheck,
    /// Approved — terminal; a lease is created.
    Approved,
    /// Approved with conditions — terminal; a lease is created.
    ConditionalApproval,
    /// Rejected — terminal, except the admin reopen.
    Rejected,
}

impl ApplicationStatus {
    /// The canonical wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::InfoRequested => "info_requested",
            Self::BackgroundCheck => "background_check",
            Self::Approved => "approved",
            Self::ConditionalApproval => "conditional_approval",
            Self::Rejected => "rejected",
        }
    }

    /// The direct successors of this status in the review graph.
    ///
    /// This is the single authoritative encoding of the graph — route
    /// handlers, the capability table, and the tests all read it. No
    /// wildcard: adding a status forces a decision here.
    pub fn successors(&self) -> &'static [ApplicationStatus] {
        match self {
            Self::Draft => &[Self::Submitted],
            Self::Submitted => &[Self::UnderReview],
            Self::UnderReview => &[
                Self::InfoRequested,
                Self::BackgroundCheck,
                Self::Approved,
                Self::ConditionalApproval,
                Self::Rejected,
            ],
            Self::InfoRequested => &[Self::UnderReview],
            Self::BackgroundCheck => &[
                Self::Approved,
                Self::ConditionalApproval,
                Self::Rejected,
            ],
            Self::Approved | Self::ConditionalApproval => &[],
            // Admin-only reopen; the capability table holds the role gate.
            Self::Rejected => &[Self::UnderReview],
        }
    }

    /// Whether this status closes the review.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::ConditionalApproval | Self::Rejected
        )
    }

    /// Whether this status permits lease creation.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved | Self::ConditionalApproval)
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by application operations.
#[derive(Error, Debug)]
pub enum ApplicationError {
    /// Malformed or missing input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller's role lacks the capability for a graph-legal edge.
    #[error("role {role} may not move an application from {from} to {to}")]
    Forbidden {
        /// The caller's role.
        role: Role,
        /// Current status.
        from: ApplicationStatus,
        /// Requested status.
        to: ApplicationStatus,
    },

    /// The requested status is not a successor of the current status.
    #[error("invalid application transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: ApplicationStatus,
        /// Requested status.
        to: ApplicationStatus,
    },

    /// A tenant operation on somebody else's application.
    #[error("application {id} does not belong to the caller")]
    NotApplicant {
        /// The application in question.
        id: ApplicationId,
    },
}

// ─── Draft input ─────────────────────────────────────────────────────

/// The applicant-supplied document an application is created from.
///
/// The four sub-documents are opaque to the state machine; only their
/// presence is validated at submission. `terms` is the listing's rent and
/// deposit schedule snapshotted at application time, so approval can
/// create the lease without re-consulting the (external) catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDraft {
    /// The listed property applied for.
    pub property_id: PropertyId,
    /// The applicant.
    pub applicant_id: ActorId,
    /// The property's owner or manager.
    pub landlord_id: ActorId,
    /// The listing agent, when one is assigned.
    #[serde(default)]
    pub agent_id: Option<ActorId>,
    /// Last completed wizard step. Progress marker only — never consulted
    /// by the state machine.
    #[serde(default)]
    pub step: u8,
    /// Applicant identity and contact details.
    #[serde(default)]
    pub personal_info: serde_json::Value,
    /// Employment and income history.
    #[serde(default)]
    pub employment: serde_json::Value,
    /// Prior-landlord and personal references.
    #[serde(default)]
    pub references: serde_json::Value,
    /// Required disclosures (evictions, convictions, pets, smoking).
    #[serde(default)]
    pub disclosures: serde_json::Value,
    /// The listing's lease terms, snapshotted at application time.
    pub terms: LeaseTerms,
}

// ─── Application ─────────────────────────────────────────────────────

/// One applicant's submission against one property listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// Unique application identifier.
    pub id: ApplicationId,
    /// The listed property applied for.
    pub property_id: PropertyId,
    /// The applicant.
    pub applicant_id: ActorId,
    /// The property's owner or manager.
    pub landlord_id: ActorId,
    /// The listing agent, when one is assigned.
    pub agent_id: Option<ActorId>,
    /// Current review status.
    pub status: ApplicationStatus,
    /// Last completed wizard step.
    pub step: u8,
    /// Applicant identity and contact details.
    pub personal_info: serde_json::Value,
    /// Employment and income history.
    pub employment: serde_json::Value,
    /// Prior-landlord and personal references.
    pub references: serde_json::Value,
    /// Required disclosures.
    pub disclosures: serde_json::Value,
    /// The listing's lease terms, snapshotted at application time.
    pub terms: LeaseTerms,
    /// Ordered log of all status changes.
    pub transitions: Vec<TransitionRecord<ApplicationStatus>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Create and immediately submit an application.
    ///
    /// Fails when a required sub-document is missing. On success the
    /// application is `Submitted` and an `application_submitted` event is
    /// emitted for dispatch.
    pub fn submit(
        draft: ApplicationDraft,
        now: DateTime<Utc>,
    ) -> Result<(Self, TransitionEvent), ApplicationError> {
        Self::validate_sections(&draft)?;
        draft.terms.validate()?;

        let mut app = Self::from_draft(draft, ApplicationStatus::Submitted, now);
        app.transitions.push(TransitionRecord::by_actor(
            ApplicationStatus::Draft,
            ApplicationStatus::Submitted,
            now,
            app.applicant_id,
            None,
        ));
        let event = TransitionEvent::by_actor(
            EventSource::Application(app.id),
            NotificationKind::ApplicationSubmitted,
            app.applicant_id,
        );
        Ok((app, event))
    }

    /// Save an in-progress application without submitting.
    ///
    /// Sub-documents may be incomplete; the listing terms must still be
    /// well-formed because they are copied from the catalog, not typed in.
    /// No event is emitted — drafts are invisible to the owner side.
    pub fn save_draft(
        draft: ApplicationDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, ApplicationError> {
        draft.terms.validate()?;
        Ok(Self::from_draft(draft, ApplicationStatus::Draft, now))
    }

    /// Submit a previously saved draft.
    ///
    /// Only the applicant may submit, and the document must be complete.
    pub fn submit_saved(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<TransitionEvent, ApplicationError> {
        self.require_applicant(actor)?;
        self.check_transition(actor.role, ApplicationStatus::Submitted)?;

        let draft_check = ApplicationDraft {
            property_id: self.property_id,
            applicant_id: self.applicant_id,
            landlord_id: self.landlord_id,
            agent_id: self.agent_id,
            step: self.step,
            personal_info: self.personal_info.clone(),
            employment: self.employment.clone(),
            references: self.references.clone(),
            disclosures: self.disclosures.clone(),
            terms: self.terms.clone(),
        };
        Self::validate_sections(&draft_check)?;

        self.apply(ApplicationStatus::Submitted, now, Some(actor.id), None);
        Ok(TransitionEvent::by_actor(
            EventSource::Application(self.id),
            NotificationKind::ApplicationSubmitted,
            actor.id,
        ))
    }

    /// Advance the review to `target`.
    ///
    /// Fails with [`ApplicationError::InvalidTransition`] when `target` is
    /// not a direct successor of the current status, and with
    /// [`ApplicationError::Forbidden`] when the edge is legal but the
    /// caller's role lacks it. On success the matching event is returned;
    /// when the new status is approved-terminal the caller must also
    /// initialize the lease.
    pub fn advance(
        &mut self,
        target: ApplicationStatus,
        actor: &Actor,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TransitionEvent, ApplicationError> {
        let kind = self.check_transition(actor.role, target)?;
        self.apply(target, now, Some(actor.id), reason);
        Ok(TransitionEvent::by_actor(
            EventSource::Application(self.id),
            kind,
            actor.id,
        ))
    }

    /// Validate an edge and resolve its event tag without mutating.
    fn check_transition(
        &self,
        role: Role,
        target: ApplicationStatus,
    ) -> Result<NotificationKind, ApplicationError> {
        let from = self.status;
        if !from.successors().contains(&target) {
            return Err(ApplicationError::InvalidTransition { from, to: target });
        }
        if !authz::allows(role, &Transition::Application { from, to: target }) {
            return Err(ApplicationError::Forbidden {
                role,
                from,
                to: target,
            });
        }
        Ok(Self::event_kind(from, target))
    }

    /// The notification tag for a validated edge.
    fn event_kind(from: ApplicationStatus, to: ApplicationStatus) -> NotificationKind {
        match to {
            ApplicationStatus::Submitted => NotificationKind::ApplicationSubmitted,
            ApplicationStatus::UnderReview if from == ApplicationStatus::Rejected => {
                NotificationKind::ApplicationReopened
            }
            ApplicationStatus::UnderReview => NotificationKind::ApplicationUnderReview,
            ApplicationStatus::InfoRequested => NotificationKind::ApplicationInfoRequested,
            ApplicationStatus::BackgroundCheck => NotificationKind::ApplicationBackgroundCheck,
            ApplicationStatus::Approved => NotificationKind::ApplicationApproved,
            ApplicationStatus::ConditionalApproval => {
                NotificationKind::ApplicationConditionalApproval
            }
            ApplicationStatus::Rejected => NotificationKind::ApplicationRejected,
            // Draft is never a transition target; successors() has no edge to it.
            ApplicationStatus::Draft => NotificationKind::ApplicationUnderReview,
        }
    }

    /// The tenancy parties for event routing.
    pub fn parties(&self) -> crate::event::Parties {
        crate::event::Parties {
            tenant: self.applicant_id,
            landlord: self.landlord_id,
            agent: self.agent_id,
        }
    }

    fn require_applicant(&self, actor: &Actor) -> Result<(), ApplicationError> {
        if actor.role == Role::Tenant && actor.id != self.applicant_id {
            return Err(ApplicationError::NotApplicant { id: self.id });
        }
        Ok(())
    }

    fn validate_sections(draft: &ApplicationDraft) -> Result<(), ApplicationError> {
        let sections = [
            ("personal_info", &draft.personal_info),
            ("employment", &draft.employment),
            ("references", &draft.references),
            ("disclosures", &draft.disclosures),
        ];
        for (name, value) in sections {
            let missing = value.is_null()
                || value.as_object().is_some_and(|o| o.is_empty())
                || value.as_array().is_some_and(|a| a.is_empty());
            if missing {
                return Err(ValidationError::MissingSection { section: name }.into());
            }
        }
        Ok(())
    }

    fn from_draft(draft: ApplicationDraft, status: ApplicationStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: ApplicationId::new(),
            property_id: draft.property_id,
            applicant_id: draft.applicant_id,
            landlord_id: draft.landlord_id,
            agent_id: draft.agent_id,
            status,
            step: draft.step,
            personal_info: draft.personal_info,
            employment: draft.employment,
            references: draft.references,
            disclosures: draft.disclosures,
            terms: draft.terms,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(
        &mut self,
        to: ApplicationStatus,
        now: DateTime<Utc>,
        actor: Option<ActorId>,
        reason: Option<String>,
    ) {
        self.transitions.push(TransitionRecord {
            from: self.status,
            to,
            at: now,
            actor,
            reason,
        });
        self.status = to;
        self.updated_at = now;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
