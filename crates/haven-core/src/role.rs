//! # Actor Roles
//!
//! The four roles the platform distinguishes. Every guarded transition is
//! authorized against a `(role, transition)` capability table — see
//! `haven-state::authz` — so the role enum is deliberately small and closed.

use serde::{Deserialize, Serialize};

/// The role an authenticated actor holds.
///
/// `Landlord` covers both individual owners and property managers: the
/// platform grants them identical capabilities over their own listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A renter: submits applications, accepts and co-signs leases,
    /// claims payments as paid.
    Tenant,
    /// A property owner or property manager: reviews applications,
    /// co-signs leases, verifies payments.
    Landlord,
    /// A listing agent acting for an owner: reviews applications and
    /// co-signs on the owner's side, but cannot verify payments.
    Agent,
    /// Platform administration: full review capabilities plus the
    /// rejected-application reopen.
    Admin,
}

impl Role {
    /// The canonical wire name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Landlord => "landlord",
            Self::Agent => "agent",
            Self::Admin => "admin",
        }
    }

    /// All roles, for matrix-style tests over the capability table.
    pub const ALL: [Role; 4] = [Role::Tenant, Role::Landlord, Role::Agent, Role::Admin];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tenant" => Ok(Self::Tenant),
            "landlord" => Ok(Self::Landlord),
            "agent" => Ok(Self::Agent),
            "admin" => Ok(Self::Admin),
            other => Err(crate::error::ValidationError::UnknownRole {
                value: other.to_string(),
            }),
        }
    }
}
