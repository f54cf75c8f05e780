//! The identity an aggregation request is made on behalf of.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::invoice::Invoice;

/// Coarse role assigned by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Staff,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "staff" | "employee" => Ok(Self::Staff),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Caller identity used to scope which invoices are visible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Viewer {
    pub user_id: Option<String>,
    pub role: Role,
    pub branch_id: Option<String>,
}

impl Viewer {
    /// A viewer that sees every invoice.
    pub fn admin() -> Self {
        Self {
            user_id: None,
            role: Role::Admin,
            branch_id: None,
        }
    }

    /// Returns true if the invoice falls inside this viewer's scope.
    ///
    /// Managers see their branch, staff see the invoices they issued. A
    /// non-admin viewer without the identifying attribute sees nothing.
    ///
    /// ```
    /// use nexus_core::{Invoice, Role, Viewer};
    ///
    /// let staff = Viewer { user_id: Some("e1".into()), role: Role::Staff, branch_id: None };
    /// assert!(staff.can_see(&Invoice::new("i1", Some("e1"), None, None)));
    /// assert!(!staff.can_see(&Invoice::new("i2", Some("e2"), None, None)));
    /// ```
    pub fn can_see(&self, invoice: &Invoice) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Manager => matches!(
                (&self.branch_id, invoice.reference(EntityKind::Branch)),
                (Some(mine), Some(theirs)) if *mine == theirs
            ),
            Role::Staff => matches!(
                (&self.user_id, invoice.reference(EntityKind::Employee)),
                (Some(mine), Some(theirs)) if *mine == theirs
            ),
        }
    }
}
