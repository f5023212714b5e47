//! # Money
//!
//! Cent-denominated integer amounts. Floats are never used for money;
//! serialization is a plain integer count of cents.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A monetary amount in whole cents (USD).
///
/// Amounts are unsigned: the platform models obligations, not balances,
/// so negative money never appears.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero dollars.
    pub const ZERO: Money = Money(0);

    /// Create an amount from a cent count.
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// The amount in whole cents.
    pub const fn as_cents(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Validate that the amount is a legal charge: strictly positive.
    ///
    /// Rent and deposit amounts must be non-zero; a zero obligation is a
    /// data-entry defect, not a free month.
    pub fn require_positive(&self, field: &'static str) -> Result<(), ValidationError> {
        if self.is_zero() {
            return Err(ValidationError::NonPositiveAmount { field });
        }
        Ok(())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}
