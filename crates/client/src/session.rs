//! Session store: "am I logged in, and with what token".
//!
//! Owns the auth-state loop. Each provider notification is handled in order:
//! a signed-in user gets a forced token refresh (which re-resolves claims and
//! then the active tenant), admins get the tenant directory, post-auth hooks
//! run, and finally the ready signal resolves. A signed-out notification
//! clears everything and redirects to the sign-in page.

use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::watch;

use axentia_auth::{AuthSnapshot, IdentityProvider, UserIdentity};
use axentia_events::{EventBus, InMemoryEventBus, SessionEvent};

use crate::claims::ClaimsCache;
use crate::config::ClientConfig;
use crate::endpoint::{EndpointResolver, LogicalPath};
use crate::error::{ClientError, ClientResult};
use crate::hooks::PostAuthHooks;
use crate::navigation::{Navigator, TOKEN_PARAM, is_on_page, take_query_param};
use crate::request::{RequestOptions, TokenSource, send_authorized};
use crate::response::{Fetched, degrade};
use crate::storage::{KeyValueStore, clear_session};
use crate::tenant::{ActiveTenantSelector, TenantDirectory, parse_tenant_list};

/// One-shot readiness flag: `true` once a signed-in user is resolved,
/// `false` when the first determination is "signed out".
///
/// Clones share the same underlying signal.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<Option<bool>>>,
}

impl ReadySignal {
    fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Resolve the signal. Only the first call has an effect.
    fn resolve(&self, value: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(value);
                true
            } else {
                false
            }
        })
    }

    /// Value if already resolved; never waits.
    pub fn peek(&self) -> Option<bool> {
        *self.tx.borrow()
    }

    pub async fn wait(&self) -> bool {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(value) => value.unwrap_or(false),
            Err(_) => false,
        }
    }

    pub fn same_as(&self, other: &ReadySignal) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<UserIdentity>,
    token: Option<String>,
}

/// Collaborators the session store drives.
pub struct SessionParts {
    pub provider: Arc<dyn IdentityProvider>,
    pub navigator: Arc<dyn Navigator>,
    pub hooks: Arc<dyn PostAuthHooks>,
    pub claims: Arc<ClaimsCache>,
    pub selector: Arc<ActiveTenantSelector>,
    pub directory: Arc<TenantDirectory>,
    pub endpoints: Arc<EndpointResolver>,
    pub events: Arc<InMemoryEventBus<SessionEvent>>,
    pub session_store: Arc<dyn KeyValueStore>,
    pub http: reqwest::Client,
    pub config: Arc<ClientConfig>,
}

pub struct SessionStore {
    parts: SessionParts,
    state: RwLock<SessionState>,
    ready: OnceLock<ReadySignal>,
}

impl SessionStore {
    pub fn new(parts: SessionParts) -> Self {
        Self {
            parts,
            state: RwLock::new(SessionState::default()),
            ready: OnceLock::new(),
        }
    }

    /// Start the auth-state loop once and return the ready signal.
    ///
    /// Every call returns the same signal; only the first subscribes to the
    /// identity provider. Must be called inside a Tokio runtime.
    pub fn initialize(self: &Arc<Self>) -> ReadySignal {
        let mut started = false;
        let signal = self
            .ready
            .get_or_init(|| {
                started = true;
                ReadySignal::new()
            })
            .clone();

        if started {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.run_auth_loop().await });
        }
        signal
    }

    /// Initialize if needed and wait for the first auth determination.
    pub async fn wait_for_auth(self: &Arc<Self>) -> bool {
        self.initialize().wait().await
    }

    pub fn ready_signal(&self) -> Option<ReadySignal> {
        self.ready.get().cloned()
    }

    /// Force a fresh token, then re-resolve claims and the active tenant.
    ///
    /// Without a current user, or when the provider fails, redirects to the
    /// sign-in page and reports an authentication error.
    pub async fn refresh_token(&self) -> ClientResult<String> {
        if self.parts.provider.current_user().is_none() {
            self.write_state().token = None;
            self.redirect_to_sign_in();
            return Err(ClientError::Authentication("no signed-in user".into()));
        }

        match self.parts.provider.id_token_result(true).await {
            Ok(result) => {
                tracing::debug!(expires_at = ?result.expires_at(), "token refreshed");
                self.write_state().token = Some(result.token.clone());
                let claims = self.parts.claims.apply(&result);
                self.parts.selector.on_claims_resolved(&claims);
                Ok(result.token)
            }
            Err(err) => {
                tracing::error!(error = %err, "token refresh failed");
                self.write_state().token = None;
                self.redirect_to_sign_in();
                Err(ClientError::Authentication(err.to_string()))
            }
        }
    }

    /// Fresh token, or `None` when unauthenticated.
    pub async fn get_token(&self) -> Option<String> {
        self.refresh_token().await.ok()
    }

    /// A user and a token are both held in memory. Never refreshes.
    pub fn is_authenticated(&self) -> bool {
        let state = self.read_state();
        state.user.is_some() && state.token.is_some()
    }

    pub async fn sign_out(&self) {
        if let Err(err) = self.parts.provider.sign_out().await {
            tracing::error!(error = %err, "provider sign-out failed");
        }
        self.clear_state();
        self.redirect_to_sign_in();
        tracing::info!("signed out");
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.read_state().user.clone()
    }

    pub fn user_email(&self) -> Option<String> {
        self.read_state().user.as_ref().and_then(|u| u.email.clone())
    }

    pub fn user_display_name(&self) -> Option<String> {
        self.read_state().user.as_ref().and_then(|u| u.display_name.clone())
    }

    async fn run_auth_loop(self: Arc<Self>) {
        self.consume_bootstrap_token().await;

        let mut changes = self.parts.provider.subscribe();
        while let Some(user) = changes.recv().await {
            match user {
                Some(user) => self.handle_signed_in(user).await,
                None => self.handle_signed_out(),
            }
        }
        tracing::debug!("identity provider closed the auth-state stream");
    }

    /// Exchange a `token` query parameter for a session, then strip it from
    /// the visible URL whatever the outcome.
    async fn consume_bootstrap_token(&self) {
        let current = self.parts.navigator.current_url();
        let (token, cleaned) = take_query_param(&current, TOKEN_PARAM);
        let Some(token) = token else {
            return;
        };

        tracing::info!("exchanging cross-domain sign-in token");
        match self.parts.provider.sign_in_with_custom_token(&token).await {
            Ok(user) => tracing::info!(uid = %user.uid, "cross-domain sign-in succeeded"),
            Err(err) => tracing::warn!(error = %err, "cross-domain sign-in failed"),
        }
        self.parts.navigator.replace_url(cleaned);
    }

    async fn handle_signed_in(&self, user: UserIdentity) {
        self.write_state().user = Some(user.clone());

        let token = match self.refresh_token().await {
            Ok(token) => token,
            Err(_) => {
                self.clear_state();
                self.resolve_ready(false);
                return;
            }
        };

        let role = self.parts.claims.role();
        if role.is_admin() {
            self.load_directory(&token).await;
        }

        let snapshot = AuthSnapshot {
            user,
            role,
            tenant_id: self.parts.claims.tenant_id(),
            backend_endpoint: self
                .parts
                .claims
                .backend_endpoint()
                .unwrap_or_else(|| self.parts.config.fallback_host.clone()),
        };

        self.parts.hooks.after_sign_in(&snapshot).await;
        tracing::info!(uid = %snapshot.user.uid, role = %snapshot.role, "session ready");
        self.publish(SessionEvent::AuthReady(snapshot));
        self.resolve_ready(true);
    }

    fn handle_signed_out(&self) {
        tracing::info!("no signed-in user");
        self.clear_state();
        self.redirect_to_sign_in();
        self.resolve_ready(false);
        self.publish(SessionEvent::SignedOut);
    }

    /// Populate the tenant directory. Failures leave the previous snapshot.
    async fn load_directory(&self, token: &str) {
        let url = self.parts.endpoints.endpoint_for(LogicalPath::DashboardApi);
        let options = RequestOptions::post_json(json!({ "action": "list_companies" }));
        let outcome = send_authorized(&self.parts.http, &url, token, options).await;

        match degrade::<Value>(outcome).await.map(|fetched| fetched.map(parse_tenant_list).non_empty()) {
            Ok(Fetched::Data(tenants)) => self.parts.directory.replace(tenants),
            Ok(Fetched::Empty) => tracing::warn!("tenant directory response was empty"),
            Ok(Fetched::Failed(_)) => tracing::warn!("tenant directory could not be loaded"),
            Err(err) => tracing::warn!(error = %err, "tenant directory could not be loaded"),
        }
    }

    fn clear_state(&self) {
        *self.write_state() = SessionState::default();
        self.parts.claims.clear();
        self.parts.selector.clear();
        self.parts.directory.clear();
        clear_session(self.parts.session_store.as_ref());
    }

    fn redirect_to_sign_in(&self) {
        let current = self.parts.navigator.current_url();
        let sign_in = &self.parts.config.sign_in_path;
        if is_on_page(&current, sign_in) {
            return;
        }
        match current.join(sign_in) {
            Ok(target) => {
                tracing::debug!(target = %target, "redirecting to sign-in");
                self.parts.navigator.navigate(target);
            }
            Err(err) => tracing::error!(error = %err, "cannot build sign-in URL"),
        }
    }

    fn resolve_ready(&self, value: bool) {
        if let Some(signal) = self.ready.get() {
            signal.resolve(value);
        }
    }

    fn publish(&self, event: SessionEvent) {
        let name = event.name();
        match self.parts.events.publish(event) {
            Ok(()) => tracing::debug!(
                event = name,
                subscribers = self.parts.events.subscriber_count(),
                "session event published"
            ),
            Err(err) => tracing::warn!(event = name, error = ?err, "session event not delivered"),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TokenSource for SessionStore {
    async fn fresh_token(&self) -> Option<String> {
        self.get_token().await
    }
}
