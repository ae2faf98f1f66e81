//! In-process identity provider.
//!
//! Used by tests and by the CLI, which starts from an already issued ID token.
//! Tokens are decoded without signature verification: the backend is the
//! party that verifies them, this side only reads the claims.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};

use axentia_core::UserId;

use crate::{AuthStateChanges, ClaimsMap, IdTokenResult, IdentityProvider, ProviderError, UserIdentity};

#[derive(Default)]
struct State {
    user: Option<UserIdentity>,
    claims: ClaimsMap,
    fixed_token: Option<String>,
    token_seq: u64,
    custom_tokens: HashMap<String, (UserIdentity, ClaimsMap)>,
    fail_refresh: bool,
    listeners: Vec<UnboundedSender<Option<UserIdentity>>>,
    subscribe_calls: usize,
    refresh_calls: usize,
}

impl State {
    fn notify(&mut self) {
        let current = self.user.clone();
        self.listeners.retain(|tx| tx.send(current.clone()).is_ok());
    }
}

#[derive(Default)]
pub struct InMemoryIdentityProvider {
    state: Mutex<State>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with a user already signed in.
    pub fn signed_in(user: UserIdentity, claims: ClaimsMap) -> Self {
        let provider = Self::new();
        {
            let mut state = provider.state();
            state.user = Some(user);
            state.claims = claims;
        }
        provider
    }

    /// Provider seeded from an issued ID token (JWT). The token is returned
    /// verbatim on every refresh.
    pub fn from_id_token(token: &str) -> Result<Self, ProviderError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<ClaimsMap>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| ProviderError::InvalidCustomToken(e.to_string()))?;
        let claims = data.claims;

        let uid = ["user_id", "sub"]
            .iter()
            .find_map(|key| claims.get(*key).and_then(Value::as_str))
            .and_then(|raw| UserId::new(raw).ok())
            .ok_or_else(|| ProviderError::InvalidCustomToken("token carries no subject".into()))?;

        let mut user = UserIdentity::new(uid);
        user.email = claims.get("email").and_then(Value::as_str).map(str::to_string);
        user.display_name = claims.get("name").and_then(Value::as_str).map(str::to_string);

        let provider = Self::signed_in(user, claims);
        provider.state().fixed_token = Some(token.to_string());
        Ok(provider)
    }

    /// Make `custom_token` exchangeable for the given user and claims.
    pub fn register_custom_token(&self, custom_token: impl Into<String>, user: UserIdentity, claims: ClaimsMap) {
        self.state().custom_tokens.insert(custom_token.into(), (user, claims));
    }

    /// Replace the claims the server would put in the next token.
    pub fn set_claims(&self, claims: ClaimsMap) {
        self.state().claims = claims;
    }

    /// Simulate a sign-in that happened elsewhere (another tab, a popup).
    pub fn sign_in(&self, user: UserIdentity, claims: ClaimsMap) {
        let mut state = self.state();
        state.user = Some(user);
        state.claims = claims;
        state.notify();
    }

    pub fn set_refresh_failure(&self, fail: bool) {
        self.state().fail_refresh = fail;
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state().subscribe_calls
    }

    pub fn refresh_calls(&self) -> usize {
        self.state().refresh_calls
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn current_user(&self) -> Option<UserIdentity> {
        self.state().user.clone()
    }

    async fn id_token_result(&self, force_refresh: bool) -> Result<IdTokenResult, ProviderError> {
        let mut state = self.state();
        let uid = match &state.user {
            Some(user) => user.uid.clone(),
            None => return Err(ProviderError::NotSignedIn),
        };

        if force_refresh {
            state.refresh_calls += 1;
            if state.fail_refresh {
                return Err(ProviderError::RefreshFailed("identity service unavailable".into()));
            }
            state.token_seq += 1;
        }

        let token = match &state.fixed_token {
            Some(token) => token.clone(),
            None => format!("id-token-{uid}-{}", state.token_seq),
        };
        Ok(IdTokenResult::new(token, state.claims.clone()))
    }

    async fn sign_in_with_custom_token(&self, token: &str) -> Result<UserIdentity, ProviderError> {
        let mut state = self.state();
        let (user, claims) = state
            .custom_tokens
            .get(token)
            .cloned()
            .ok_or_else(|| ProviderError::InvalidCustomToken("unknown custom token".into()))?;

        tracing::debug!(uid = %user.uid, "custom token exchanged");
        state.user = Some(user.clone());
        state.claims = claims;
        state.fixed_token = None;
        state.notify();
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.user = None;
        state.claims = ClaimsMap::new();
        state.fixed_token = None;
        state.notify();
        Ok(())
    }

    fn subscribe(&self) -> AuthStateChanges {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state();
        state.subscribe_calls += 1;
        if tx.send(state.user.clone()).is_ok() {
            state.listeners.push(tx);
        }
        rx
    }
}
