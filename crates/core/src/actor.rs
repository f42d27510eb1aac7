//! Actor roles for lock and approval rules.
//!
//! Authentication lives outside this system; requests arrive with an actor
//! identity and a declared role, and the rules here decide what that role
//! may do.

use serde::{Deserialize, Serialize};

/// Role of the actor performing an operation.
///
/// Roles are ordered from lowest to highest privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Read-only access.
    Viewer = 0,
    /// Enters and posts vouchers.
    Accountant = 1,
    /// Approves authorizations, unlocks periods, signs reconciliations.
    ChiefAccountant = 2,
    /// Full administrative access.
    Admin = 3,
}

impl ActorRole {
    /// Parse a role from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "accountant" => Some(Self::Accountant),
            "chief_accountant" => Some(Self::ChiefAccountant),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Accountant => "accountant",
            Self::ChiefAccountant => "chief_accountant",
            Self::Admin => "admin",
        }
    }

    /// Returns true if the role may unlock a budget period.
    #[must_use]
    pub fn can_unlock_period(&self) -> bool {
        matches!(self, Self::ChiefAccountant | Self::Admin)
    }

    /// Returns true if the role may approve or reject a spending authorization.
    #[must_use]
    pub fn can_approve_authorization(&self) -> bool {
        matches!(self, Self::ChiefAccountant | Self::Admin)
    }

    /// Returns true if the role may approve a reconciliation record.
    #[must_use]
    pub fn can_approve_reconciliation(&self) -> bool {
        matches!(self, Self::ChiefAccountant | Self::Admin)
    }
}
