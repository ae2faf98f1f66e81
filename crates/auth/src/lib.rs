//! `axentia-auth`: authentication/authorization facts for the dashboard client.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to read claims, which role a caller has, and what the identity provider
//! must offer. Session lifecycle lives in `axentia-client`.

pub mod authorize;
pub mod claims;
pub mod in_memory;
pub mod principal;
pub mod provider;
pub mod roles;

pub use authorize::{Audience, AuthzError, require_admin};
pub use claims::{ClaimsMap, IdTokenResult, ResolvedClaims, resolve_claims};
pub use in_memory::InMemoryIdentityProvider;
pub use principal::{AuthSnapshot, UserIdentity};
pub use provider::{AuthStateChanges, IdentityProvider, ProviderError};
pub use roles::Role;
