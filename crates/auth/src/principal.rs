use serde::{Deserialize, Serialize};

use axentia_core::{TenantId, UserId};

use crate::Role;

/// Identity of the signed-in user, owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(uid: UserId) -> Self {
        Self {
            uid,
            display_name: None,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name to show in the UI: display name, then email, then a generic label.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.email.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("Utente")
    }
}

/// Auth facts published once a signed-in user has been fully resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSnapshot {
    pub user: UserIdentity,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub backend_endpoint: String,
}

impl AuthSnapshot {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
