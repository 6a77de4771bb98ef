//! Roles and the operations they unlock

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried in the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Role {
    /// Field staff and clerks - day-to-day record entry
    #[default]
    Staff = 0,
    /// Estate managers - may close and reopen periods
    Manager = 1,
    /// Administrators
    Admin = 2,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Staff => write!(f, "staff"),
            Role::Manager => write!(f, "manager"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Operations that need more than a valid token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ReadRecords,
    WriteRecords,
    ReadClosing,
    ClosePeriod,
    ReopenPeriod,
    ReadActivity,
}

/// Minimum role for an operation
pub fn required_role(operation: Operation) -> Role {
    match operation {
        Operation::ReadRecords
        | Operation::WriteRecords
        | Operation::ReadClosing => Role::Staff,

        Operation::ClosePeriod
        | Operation::ReopenPeriod
        | Operation::ReadActivity => Role::Manager,
    }
}

pub fn is_allowed(operation: Operation, role: Role) -> bool {
    role >= required_role(operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_cannot_close() {
        assert!(is_allowed(Operation::WriteRecords, Role::Staff));
        assert!(!is_allowed(Operation::ClosePeriod, Role::Staff));
        assert!(!is_allowed(Operation::ReopenPeriod, Role::Staff));
    }

    #[test]
    fn test_manager_and_admin_can_close() {
        assert!(is_allowed(Operation::ClosePeriod, Role::Manager));
        assert!(is_allowed(Operation::ReopenPeriod, Role::Admin));
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin > Role::Manager);
        assert!(Role::Manager > Role::Staff);
    }
}
