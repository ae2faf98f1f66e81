//! `axentia-client`: session, claims and tenant routing for the Axentia
//! automation dashboard, plus the feature modules built on top of them.
//!
//! Start from [`AppContextBuilder`]: it wires the identity provider, the
//! stores and the HTTP client into an [`AppContext`] that every feature
//! module receives.

pub mod claims;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod features;
pub mod hooks;
pub mod lenient;
pub mod navigation;
pub mod request;
pub mod response;
pub mod session;
pub mod storage;
pub mod tenant;
pub mod ui;

pub use claims::ClaimsCache;
pub use config::ClientConfig;
pub use context::{AppContext, AppContextBuilder};
pub use endpoint::{EndpointResolver, HostSource, LogicalPath};
pub use error::{ClientError, ClientResult};
pub use hooks::{NoopHooks, PostAuthHooks};
pub use navigation::{MemoryNavigator, Navigator};
pub use request::{AuthenticatedRequester, RequestOptions, UploadFile};
pub use response::{Fetched, Mutation};
pub use session::{ReadySignal, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use tenant::{ActiveTenantSelector, Tenant, TenantDirectory};
