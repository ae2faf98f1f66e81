use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use axentia_core::TenantId;

use crate::Role;

/// Raw custom-claims map embedded in an ID token.
pub type ClaimsMap = Map<String, Value>;

pub const ROLE_CLAIM: &str = "role";
pub const TENANT_CLAIM: &str = "company_id";
pub const ENDPOINT_CLAIM: &str = "n8n_endpoint";

/// Token plus its decoded claims, as returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenResult {
    pub token: String,
    pub claims: ClaimsMap,
}

impl IdTokenResult {
    pub fn new(token: impl Into<String>, claims: ClaimsMap) -> Self {
        Self {
            token: token.into(),
            claims,
        }
    }

    /// Expiration (`exp` claim, seconds since epoch) if the token carries one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Authorization facts derived from a token.
///
/// Only trustworthy right after a forced refresh; anything cached from an
/// earlier refresh must be treated as stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedClaims {
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub backend_endpoint: String,
}

/// Extract role, tenant and backend endpoint from a claims map.
///
/// - missing/unknown role → [`Role::User`]
/// - missing/blank tenant → `None`
/// - missing/blank endpoint → `fallback_host`
pub fn resolve_claims(claims: &ClaimsMap, fallback_host: &str) -> ResolvedClaims {
    let role = Role::from_claim(claims.get(ROLE_CLAIM));

    let tenant_id = claims
        .get(TENANT_CLAIM)
        .and_then(Value::as_str)
        .and_then(|raw| TenantId::new(raw).ok());

    let backend_endpoint = claims
        .get(ENDPOINT_CLAIM)
        .and_then(Value::as_str)
        .map(|raw| raw.trim().trim_end_matches('/'))
        .filter(|host| !host.is_empty())
        .unwrap_or(fallback_host)
        .to_string();

    ResolvedClaims {
        role,
        tenant_id,
        backend_endpoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const FALLBACK: &str = "https://fallback.example";

    fn map(value: Value) -> ClaimsMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn full_claims_are_extracted() {
        let claims = map(json!({
            "role": "admin",
            "company_id": "acme",
            "n8n_endpoint": "https://acme-n8n.example/"
        }));
        let resolved = resolve_claims(&claims, FALLBACK);
        assert_eq!(resolved.role, Role::Admin);
        assert_eq!(resolved.tenant_id.unwrap().as_str(), "acme");
        assert_eq!(resolved.backend_endpoint, "https://acme-n8n.example");
    }

    #[test]
    fn empty_claims_fall_back_to_defaults() {
        let resolved = resolve_claims(&ClaimsMap::new(), FALLBACK);
        assert_eq!(resolved.role, Role::User);
        assert!(resolved.tenant_id.is_none());
        assert_eq!(resolved.backend_endpoint, FALLBACK);
    }

    #[test]
    fn blank_tenant_and_endpoint_are_treated_as_absent() {
        let claims = map(json!({"company_id": "  ", "n8n_endpoint": ""}));
        let resolved = resolve_claims(&claims, FALLBACK);
        assert!(resolved.tenant_id.is_none());
        assert_eq!(resolved.backend_endpoint, FALLBACK);
    }

    #[test]
    fn expiry_is_read_from_exp() {
        let result = IdTokenResult::new("t", map(json!({"exp": 1_700_000_000})));
        assert_eq!(result.expires_at().unwrap().timestamp(), 1_700_000_000);
        assert!(IdTokenResult::new("t", ClaimsMap::new()).expires_at().is_none());
    }

    proptest! {
        #[test]
        fn claims_without_role_never_resolve_to_admin(
            tenant in proptest::option::of("[a-z0-9-]{0,12}"),
            endpoint in proptest::option::of("https://[a-z]{1,8}\\.example"),
            extra_key in "[a-z_]{1,10}",
            extra_value in ".*",
        ) {
            let mut claims = ClaimsMap::new();
            if let Some(t) = tenant { claims.insert(TENANT_CLAIM.into(), json!(t)); }
            if let Some(e) = endpoint { claims.insert(ENDPOINT_CLAIM.into(), json!(e)); }
            if extra_key != ROLE_CLAIM {
                claims.insert(extra_key, json!(extra_value));
            }
            prop_assert_eq!(resolve_claims(&claims, FALLBACK).role, Role::User);
        }
    }
}
