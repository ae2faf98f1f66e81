//! Role, tenant and backend endpoint as resolved from the last forced refresh.

use std::sync::{Arc, RwLock};

use axentia_auth::{IdTokenResult, ResolvedClaims, Role, resolve_claims};
use axentia_core::TenantId;

use crate::storage::{KeyValueStore, keys};

/// Process-wide cache of the last resolved claims.
///
/// Written only by [`ClaimsCache::apply`] (i.e. after a forced refresh) and by
/// [`ClaimsCache::clear`] on sign-out. The three facts are mirrored into the
/// session store so code without access to the provider can read them.
pub struct ClaimsCache {
    store: Arc<dyn KeyValueStore>,
    fallback_host: String,
    current: RwLock<Option<ResolvedClaims>>,
}

impl ClaimsCache {
    pub fn new(store: Arc<dyn KeyValueStore>, fallback_host: impl Into<String>) -> Self {
        Self {
            store,
            fallback_host: fallback_host.into(),
            current: RwLock::new(None),
        }
    }

    pub fn apply(&self, result: &IdTokenResult) -> ResolvedClaims {
        let resolved = resolve_claims(&result.claims, &self.fallback_host);

        self.store.set(keys::BACKEND_ENDPOINT, &resolved.backend_endpoint);
        self.store.set(keys::ROLE, resolved.role.as_str());
        match &resolved.tenant_id {
            Some(tenant) => self.store.set(keys::TENANT_ID, tenant.as_str()),
            None => self.store.remove(keys::TENANT_ID),
        }

        tracing::debug!(
            role = %resolved.role,
            tenant = ?resolved.tenant_id.as_ref().map(TenantId::as_str),
            endpoint = %resolved.backend_endpoint,
            "claims resolved"
        );

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(resolved.clone());
        resolved
    }

    pub fn current(&self) -> Option<ResolvedClaims> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn role(&self) -> Role {
        self.current().map(|c| c.role).unwrap_or_default()
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.current().and_then(|c| c.tenant_id)
    }

    /// Endpoint from the in-memory claims only.
    pub fn backend_endpoint(&self) -> Option<String> {
        self.current().map(|c| c.backend_endpoint)
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.store.remove(keys::BACKEND_ENDPOINT);
        self.store.remove(keys::ROLE);
        self.store.remove(keys::TENANT_ID);
    }
}
