//! The explicit application context.
//!
//! Built once at start-up and handed (cheaply cloned) to every feature
//! module. It owns the single writers of session, claims and tenant state;
//! feature modules only read through it.

use std::sync::Arc;

use reqwest::Url;

use axentia_auth::{IdentityProvider, Role};
use axentia_core::{DomainError, TenantId};
use axentia_events::{EventBus, InMemoryEventBus, SessionEvent, Subscription};

use crate::claims::ClaimsCache;
use crate::config::ClientConfig;
use crate::endpoint::{EndpointResolver, HostSource, LogicalPath};
use crate::error::ClientResult;
use crate::features::{Administration, KnowledgeBase, Reports, Support, Workflows};
use crate::hooks::{NoopHooks, PostAuthHooks};
use crate::navigation::{MemoryNavigator, Navigator};
use crate::request::AuthenticatedRequester;
use crate::response::Mutation;
use crate::session::{ReadySignal, SessionParts, SessionStore};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, conversation_id};
use crate::tenant::{ActiveTenantSelector, TenantDirectory};

pub const PERSISTENT_STORE_FILE: &str = "state.json";

#[derive(Clone)]
pub struct AppContext {
    config: Arc<ClientConfig>,
    session: Arc<SessionStore>,
    claims: Arc<ClaimsCache>,
    directory: Arc<TenantDirectory>,
    selector: Arc<ActiveTenantSelector>,
    endpoints: Arc<EndpointResolver>,
    requester: AuthenticatedRequester,
    events: Arc<InMemoryEventBus<SessionEvent>>,
    navigator: Arc<dyn Navigator>,
    persistent: Arc<dyn KeyValueStore>,
}

impl AppContext {
    pub fn builder(config: ClientConfig, provider: Arc<dyn IdentityProvider>) -> AppContextBuilder {
        AppContextBuilder::new(config, provider)
    }

    pub fn initialize(&self) -> ReadySignal {
        self.session.initialize()
    }

    pub async fn wait_for_auth(&self) -> bool {
        self.session.wait_for_auth().await
    }

    pub fn subscribe(&self) -> Subscription<SessionEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn claims(&self) -> &ClaimsCache {
        &self.claims
    }

    pub fn directory(&self) -> &TenantDirectory {
        &self.directory
    }

    pub fn endpoints(&self) -> &EndpointResolver {
        &self.endpoints
    }

    pub fn requester(&self) -> &AuthenticatedRequester {
        &self.requester
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn persistent_store(&self) -> &dyn KeyValueStore {
        self.persistent.as_ref()
    }

    pub fn role(&self) -> Role {
        self.selector.role()
    }

    pub fn is_admin(&self) -> bool {
        self.selector.is_admin()
    }

    pub fn active_tenant(&self) -> Option<TenantId> {
        self.selector.active_tenant()
    }

    pub fn set_active_tenant(&self, tenant: Option<TenantId>) -> Mutation {
        self.selector.set_active_tenant(tenant)
    }

    pub fn endpoint(&self, path: LogicalPath) -> String {
        self.endpoints.endpoint_for(path)
    }

    /// Chat conversation id, stable across restarts.
    pub fn conversation_id(&self) -> String {
        conversation_id(self.persistent.as_ref())
    }

    pub fn reports(&self) -> Reports {
        Reports::new(self.clone())
    }

    pub fn workflows(&self) -> Workflows {
        Workflows::new(self.clone())
    }

    pub fn knowledge_base(&self) -> KnowledgeBase {
        KnowledgeBase::new(self.clone())
    }

    pub fn support(&self) -> Support {
        Support::new(self.clone())
    }

    pub fn administration(&self) -> Administration {
        Administration::new(self.clone())
    }
}

pub struct AppContextBuilder {
    config: ClientConfig,
    provider: Arc<dyn IdentityProvider>,
    navigator: Option<Arc<dyn Navigator>>,
    session_store: Option<Arc<dyn KeyValueStore>>,
    persistent_store: Option<Arc<dyn KeyValueStore>>,
    hooks: Option<Arc<dyn PostAuthHooks>>,
    http: Option<reqwest::Client>,
    host_order: Option<Vec<HostSource>>,
}

impl AppContextBuilder {
    pub fn new(config: ClientConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            config,
            provider,
            navigator: None,
            session_store: None,
            persistent_store: None,
            hooks: None,
            http: None,
            host_order: None,
        }
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn persistent_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.persistent_store = Some(store);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn PostAuthHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn host_order(mut self, order: Vec<HostSource>) -> Self {
        self.host_order = Some(order);
        self
    }

    /// Wire everything together.
    ///
    /// Defaults: a memory navigator on `config.app_url`, a memory session
    /// store, a file-backed persistent store under `config.state_dir` (memory
    /// when unset), no-op hooks.
    pub fn build(self) -> ClientResult<AppContext> {
        let config = Arc::new(self.config);

        let navigator: Arc<dyn Navigator> = match self.navigator {
            Some(navigator) => navigator,
            None => {
                let url = Url::parse(&config.app_url)
                    .map_err(|err| DomainError::validation(format!("invalid app url '{}': {err}", config.app_url)))?;
                Arc::new(MemoryNavigator::new(url))
            }
        };

        let session_store: Arc<dyn KeyValueStore> = self.session_store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let persistent: Arc<dyn KeyValueStore> = match self.persistent_store {
            Some(store) => store,
            None => match &config.state_dir {
                Some(dir) => Arc::new(FileStore::open(dir.join(PERSISTENT_STORE_FILE))),
                None => Arc::new(MemoryStore::new()),
            },
        };
        let hooks = self.hooks.unwrap_or_else(|| Arc::new(NoopHooks));
        let http = self.http.unwrap_or_default();

        let events = Arc::new(InMemoryEventBus::new());
        let claims = Arc::new(ClaimsCache::new(session_store.clone(), config.fallback_host.clone()));
        let directory = Arc::new(TenantDirectory::new(session_store.clone()));
        let selector = Arc::new(ActiveTenantSelector::new(session_store.clone(), events.clone()));

        let mut endpoints = EndpointResolver::new(
            claims.clone(),
            selector.clone(),
            directory.clone(),
            session_store.clone(),
            config.fallback_host.clone(),
            config.central_host.clone(),
        );
        if let Some(order) = self.host_order {
            endpoints = endpoints.with_order(order);
        }
        let endpoints = Arc::new(endpoints);

        let session = Arc::new(SessionStore::new(SessionParts {
            provider: self.provider,
            navigator: navigator.clone(),
            hooks,
            claims: claims.clone(),
            selector: selector.clone(),
            directory: directory.clone(),
            endpoints: endpoints.clone(),
            events: events.clone(),
            session_store: session_store.clone(),
            http: http.clone(),
            config: config.clone(),
        }));

        let requester = AuthenticatedRequester::new(session.clone(), selector.clone(), http);

        Ok(AppContext {
            config,
            session,
            claims,
            directory,
            selector,
            endpoints,
            requester,
            events,
            navigator,
            persistent,
        })
    }
}
