//! Logical API path → fully-qualified webhook URL.

use std::sync::Arc;

use crate::claims::ClaimsCache;
use crate::storage::{KeyValueStore, keys};
use crate::tenant::{ActiveTenantSelector, TenantDirectory};

/// Where a per-tenant backend host may come from, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSource {
    /// The admin-selected tenant's own host, when the directory lists one.
    SelectedTenant,
    /// `n8n_endpoint` from the in-memory claims.
    Claims,
    /// The session-store copy of the claims endpoint.
    SessionCache,
    /// The configured fallback host.
    Fallback,
}

pub const DEFAULT_ORDER: [HostSource; 4] = [
    HostSource::SelectedTenant,
    HostSource::Claims,
    HostSource::SessionCache,
    HostSource::Fallback,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalPath {
    /// Reports, workflows, agents, knowledge base (per-tenant host).
    DashboardApi,
    /// Support tickets (centralized).
    SupportApi,
    /// Users and companies administration (centralized).
    UserManagement,
}

impl LogicalPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalPath::DashboardApi => "dashboard-api",
            LogicalPath::SupportApi => "support-api",
            LogicalPath::UserManagement => "user-management",
        }
    }

    pub fn is_centralized(&self) -> bool {
        !matches!(self, LogicalPath::DashboardApi)
    }
}

pub struct EndpointResolver {
    claims: Arc<ClaimsCache>,
    selector: Arc<ActiveTenantSelector>,
    directory: Arc<TenantDirectory>,
    store: Arc<dyn KeyValueStore>,
    fallback_host: String,
    central_host: String,
    order: Vec<HostSource>,
}

impl EndpointResolver {
    pub fn new(
        claims: Arc<ClaimsCache>,
        selector: Arc<ActiveTenantSelector>,
        directory: Arc<TenantDirectory>,
        store: Arc<dyn KeyValueStore>,
        fallback_host: impl Into<String>,
        central_host: impl Into<String>,
    ) -> Self {
        Self {
            claims,
            selector,
            directory,
            store,
            fallback_host: fallback_host.into(),
            central_host: central_host.into(),
            order: DEFAULT_ORDER.to_vec(),
        }
    }

    pub fn with_order(mut self, order: Vec<HostSource>) -> Self {
        self.order = order;
        self
    }

    pub fn order(&self) -> &[HostSource] {
        &self.order
    }

    /// First host produced by the strategy list; the fallback host if none.
    pub fn resolve_host(&self) -> String {
        self.order
            .iter()
            .find_map(|source| self.host_from(*source))
            .unwrap_or_else(|| self.fallback_host.clone())
    }

    /// Per-tenant URL for `path`.
    pub fn resolve(&self, path: &str) -> String {
        webhook_url(&self.resolve_host(), path)
    }

    /// URL on the centralized host, independent of the active tenant.
    pub fn resolve_central(&self, path: &str) -> String {
        webhook_url(&self.central_host, path)
    }

    pub fn endpoint_for(&self, path: LogicalPath) -> String {
        if path.is_centralized() {
            self.resolve_central(path.as_str())
        } else {
            self.resolve(path.as_str())
        }
    }

    fn host_from(&self, source: HostSource) -> Option<String> {
        match source {
            HostSource::SelectedTenant => self
                .selector
                .request_scope()
                .and_then(|tenant| self.directory.endpoint_of(&tenant)),
            HostSource::Claims => self.claims.backend_endpoint(),
            HostSource::SessionCache => self.store.get(keys::BACKEND_ENDPOINT),
            HostSource::Fallback => Some(self.fallback_host.clone()),
        }
        .filter(|host| !host.trim().is_empty())
    }
}

fn webhook_url(host: &str, path: &str) -> String {
    format!("{}/webhook/{}", host.trim().trim_end_matches('/'), path.trim_start_matches('/'))
}
