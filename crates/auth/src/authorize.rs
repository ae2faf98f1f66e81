use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: admin role required")]
    AdminOnly,
}

/// Guard for admin-only operations.
///
/// - No IO
/// - No panics
///
/// Callers treat the error as a silent no-op: nothing is shown to the user
/// and no request is issued.
pub fn require_admin(role: Role) -> Result<(), AuthzError> {
    if role.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminOnly)
    }
}

/// Who a piece of UI is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Admin,
    User,
    Any,
}

impl Audience {
    pub fn is_visible_to(&self, role: Role) -> bool {
        match self {
            Audience::Admin => role.is_admin(),
            Audience::User => !role.is_admin(),
            Audience::Any => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_guard() {
        assert!(require_admin(Role::Admin).is_ok());
        assert_eq!(require_admin(Role::User), Err(AuthzError::AdminOnly));
    }

    #[test]
    fn audience_gating() {
        assert!(Audience::Admin.is_visible_to(Role::Admin));
        assert!(!Audience::Admin.is_visible_to(Role::User));
        assert!(Audience::User.is_visible_to(Role::User));
        assert!(!Audience::User.is_visible_to(Role::Admin));
        assert!(Audience::Any.is_visible_to(Role::User));
    }
}
