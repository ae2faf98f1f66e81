use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{IdTokenResult, UserIdentity};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("custom token rejected: {0}")]
    InvalidCustomToken(String),
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

/// Stream of auth state changes. `None` means signed out.
pub type AuthStateChanges = UnboundedReceiver<Option<UserIdentity>>;

/// Capability offered by the hosted identity service.
///
/// Implementations must deliver the *current* state to a new subscriber
/// immediately, then every subsequent change.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserIdentity>;

    /// Fetch the token and its claims. `force_refresh` bypasses any cached
    /// token so that claims reflect the latest server-side grants.
    async fn id_token_result(&self, force_refresh: bool) -> Result<IdTokenResult, ProviderError>;

    async fn sign_in_with_custom_token(&self, token: &str) -> Result<UserIdentity, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    fn subscribe(&self) -> AuthStateChanges;
}
