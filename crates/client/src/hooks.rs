use async_trait::async_trait;

use axentia_auth::AuthSnapshot;

/// Optional side effects run once a signed-in user is resolved, before the
/// ready signal fires (badge rendering, admin-only UI, unread counters).
#[async_trait]
pub trait PostAuthHooks: Send + Sync {
    async fn after_sign_in(&self, _snapshot: &AuthSnapshot) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl PostAuthHooks for NoopHooks {}
