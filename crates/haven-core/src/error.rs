//! # Validation Errors
//!
//! Input-shape errors shared across the workspace. State-machine errors
//! (invalid transitions, capability denials) live with their machines in
//! `haven-state`; this module covers only malformed values.

use thiserror::Error;

/// A malformed or missing input value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required document section is absent or empty.
    #[error("missing required section '{section}'")]
    MissingSection {
        /// The absent section name.
        section: &'static str,
    },

    /// A monetary amount that must be positive is zero.
    #[error("{field} must be a positive amount")]
    NonPositiveAmount {
        /// The offending field name.
        field: &'static str,
    },

    /// Rent due day outside the 1..=28 range every month contains.
    #[error("rent due day must be between 1 and 28, got {day}")]
    InvalidDueDay {
        /// The rejected day-of-month.
        day: u8,
    },

    /// A date range whose end does not follow its start.
    #[error("{field}: end date must be after start date")]
    EmptyDateRange {
        /// The offending field name.
        field: &'static str,
    },

    /// A date that falls before the earliest legal value.
    #[error("{field} must not precede {bound}")]
    DateBeforeBound {
        /// The offending field name.
        field: &'static str,
        /// Description of the violated lower bound.
        bound: &'static str,
    },

    /// An unrecognized role name.
    #[error("unknown role '{value}'")]
    UnknownRole {
        /// The rejected value.
        value: String,
    },
}
