use serde::{Deserialize, Serialize};

use axentia_auth::AuthSnapshot;
use axentia_core::TenantId;

/// Events emitted by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A signed-in user has been fully resolved (claims refreshed, tenant
    /// state settled, post-auth hooks run).
    AuthReady(AuthSnapshot),
    /// An admin changed the active tenant. `None` means "all tenants".
    TenantFilterChanged { tenant_id: Option<TenantId> },
    SignedOut,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::AuthReady(_) => "auth_ready",
            SessionEvent::TenantFilterChanged { .. } => "tenant_filter_changed",
            SessionEvent::SignedOut => "signed_out",
        }
    }
}
