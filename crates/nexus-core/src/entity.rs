//! Entities whose display names are resolved from their owning service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fallback returned for employees and branches that cannot be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Fallback returned for customers that cannot be resolved.
pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

/// Prefix of the shared cache namespace for customer names.
pub const CUSTOMER_KEY_PREFIX: &str = "customer:";

/// An entity referenced by id from an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Owned by the employee directory.
    Employee,
    /// Owned by the branch/vendor directory.
    Branch,
    /// Owned by the CRM service.
    Customer,
}

impl EntityKind {
    /// All kinds, in the order they appear on an enriched record.
    pub const ALL: [EntityKind; 3] = [Self::Employee, Self::Branch, Self::Customer];

    /// Sentinel name used when the entity cannot be resolved.
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_core::EntityKind;
    ///
    /// assert_eq!(EntityKind::Branch.fallback(), "Unknown");
    /// assert_eq!(EntityKind::Customer.fallback(), "Walk-in Customer");
    /// ```
    pub fn fallback(&self) -> &'static str {
        match self {
            Self::Employee | Self::Branch => UNKNOWN,
            Self::Customer => WALK_IN_CUSTOMER,
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Branch => "branch",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared cache key for a customer's display name.
///
/// ```
/// assert_eq!(nexus_core::customer_key("c1"), "customer:c1");
/// ```
pub fn customer_key(id: &str) -> String {
    format!("{CUSTOMER_KEY_PREFIX}{id}")
}
