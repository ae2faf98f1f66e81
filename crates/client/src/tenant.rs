//! Tenant directory and the active-tenant selector.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use axentia_auth::{ResolvedClaims, Role};
use axentia_core::TenantId;
use axentia_events::{EventBus, InMemoryEventBus, SessionEvent};

use crate::lenient;
use crate::response::Mutation;
use crate::storage::{KeyValueStore, keys, read_json, write_json};

pub const ALL_TENANTS_LABEL: &str = "Tutte le aziende";
pub const UNKNOWN_TENANT_LABEL: &str = "Sconosciuta";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(rename = "company_id")]
    pub id: TenantId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(rename = "n8n_endpoint", default, skip_serializing_if = "Option::is_none")]
    pub backend_endpoint: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_datetime", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Tenant {
    pub fn new(id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            backend_endpoint: None,
            created_at: None,
        }
    }

    pub fn with_backend_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.backend_endpoint = Some(endpoint.into());
        self
    }
}

/// Tenant list as the backend returns it, bare or under `companies`.
/// Entries without a usable `company_id` are skipped.
pub fn parse_tenant_list(value: Value) -> Vec<Tenant> {
    lenient::list(value, "companies")
}

/// All tenants the backend exposes. Populated for admins only.
pub struct TenantDirectory {
    store: Arc<dyn KeyValueStore>,
    entries: RwLock<Vec<Tenant>>,
}

impl TenantDirectory {
    /// Restores the session snapshot if one exists.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = read_json::<Vec<Tenant>>(store.as_ref(), keys::TENANT_DIRECTORY).unwrap_or_default();
        Self {
            store,
            entries: RwLock::new(entries),
        }
    }

    pub fn replace(&self, tenants: Vec<Tenant>) {
        write_json(self.store.as_ref(), keys::TENANT_DIRECTORY, &tenants);
        tracing::debug!(count = tenants.len(), "tenant directory replaced");
        *self.entries.write().unwrap_or_else(|e| e.into_inner()) = tenants;
    }

    pub fn all(&self) -> Vec<Tenant> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn get(&self, id: &TenantId) -> Option<Tenant> {
        self.entries().iter().find(|t| &t.id == id).cloned()
    }

    /// Human-readable name; `None` means "all tenants".
    pub fn name_of(&self, id: Option<&TenantId>) -> String {
        match id {
            None => ALL_TENANTS_LABEL.to_string(),
            Some(id) => self
                .get(id)
                .map(|t| t.name)
                .unwrap_or_else(|| UNKNOWN_TENANT_LABEL.to_string()),
        }
    }

    /// The tenant's own backend host, if it has one.
    pub fn endpoint_of(&self, id: &TenantId) -> Option<String> {
        self.get(id)
            .and_then(|t| t.backend_endpoint)
            .map(|host| host.trim().trim_end_matches('/').to_string())
            .filter(|host| !host.is_empty())
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.store.remove(keys::TENANT_DIRECTORY);
    }

    fn entries(&self) -> RwLockReadGuard<'_, Vec<Tenant>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Default, Clone)]
struct SelectorState {
    role: Role,
    own: Option<TenantId>,
    selected: Option<TenantId>,
}

/// Decides which tenant's data is active for the caller.
///
/// Admins may pick any tenant or `None` ("all"); the choice survives reloads
/// through the session store. Regular users are pinned to their own tenant.
pub struct ActiveTenantSelector {
    store: Arc<dyn KeyValueStore>,
    events: Arc<InMemoryEventBus<SessionEvent>>,
    state: RwLock<SelectorState>,
}

impl ActiveTenantSelector {
    pub fn new(store: Arc<dyn KeyValueStore>, events: Arc<InMemoryEventBus<SessionEvent>>) -> Self {
        Self {
            store,
            events,
            state: RwLock::new(SelectorState::default()),
        }
    }

    /// Must run after the claims for the same refresh have been applied.
    pub fn on_claims_resolved(&self, claims: &ResolvedClaims) {
        let mut state = self.write_state();
        state.role = claims.role;
        state.own = claims.tenant_id.clone();

        if claims.role.is_admin() {
            state.selected = self
                .store
                .get(keys::SELECTED_TENANT)
                .and_then(|raw| TenantId::new(raw).ok());
        } else {
            state.selected = claims.tenant_id.clone();
            match &state.selected {
                Some(own) => self.store.set(keys::SELECTED_TENANT, own.as_str()),
                None => self.store.remove(keys::SELECTED_TENANT),
            }
        }

        tracing::debug!(
            role = %state.role,
            active = ?state.selected.as_ref().map(TenantId::as_str),
            "active tenant settled"
        );
    }

    /// `None` means "all tenants" (admins only).
    pub fn active_tenant(&self) -> Option<TenantId> {
        let state = self.read_state();
        if state.role.is_admin() {
            state.selected.clone()
        } else {
            state.own.clone()
        }
    }

    /// Tenant to add to request bodies: set only for an admin with a filter.
    pub fn request_scope(&self) -> Option<TenantId> {
        let state = self.read_state();
        if state.role.is_admin() { state.selected.clone() } else { None }
    }

    pub fn is_admin(&self) -> bool {
        self.read_state().role.is_admin()
    }

    pub fn role(&self) -> Role {
        self.read_state().role
    }

    /// Change the active tenant. A guarded no-op for non-admins.
    ///
    /// The change notification goes out only once both the in-memory state
    /// and the persisted copy hold the new value.
    pub fn set_active_tenant(&self, tenant: Option<TenantId>) -> Mutation {
        {
            let mut state = self.write_state();
            if !state.role.is_admin() {
                tracing::debug!("ignoring tenant change from a non-admin caller");
                return Mutation::Ignored;
            }
            match &tenant {
                Some(id) => self.store.set(keys::SELECTED_TENANT, id.as_str()),
                None => self.store.remove(keys::SELECTED_TENANT),
            }
            state.selected = tenant.clone();
        }

        tracing::info!(tenant = ?tenant.as_ref().map(TenantId::as_str), "tenant filter changed");
        if let Err(err) = self.events.publish(SessionEvent::TenantFilterChanged { tenant_id: tenant }) {
            tracing::warn!(error = ?err, "tenant filter notification not delivered");
        }
        Mutation::Applied
    }

    pub fn clear(&self) {
        *self.write_state() = SelectorState::default();
        self.store.remove(keys::SELECTED_TENANT);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SelectorState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SelectorState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
