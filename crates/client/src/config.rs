//! Client configuration, read from the environment.

use std::path::PathBuf;

pub const DEFAULT_FALLBACK_HOST: &str = "https://main-n8n.axentia-automation.it";
pub const DEFAULT_SIGN_IN_PATH: &str = "login.html";
pub const DEFAULT_APP_URL: &str = "https://dashboard.axentia-automation.it/index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Per-tenant host used when neither the selected tenant nor the claims
    /// name one.
    pub fallback_host: String,
    /// Host of the centralized APIs (user management, support).
    pub central_host: String,
    pub sign_in_path: String,
    /// Page the client starts on.
    pub app_url: String,
    /// Directory of the persistent store. `None` keeps everything in memory.
    pub state_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            fallback_host: DEFAULT_FALLBACK_HOST.to_string(),
            central_host: DEFAULT_FALLBACK_HOST.to_string(),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            state_dir: dirs::data_local_dir().map(|dir| dir.join("axentia")),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let fallback_host = std::env::var("AXENTIA_FALLBACK_HOST")
            .map(|host| normalize_host(&host))
            .unwrap_or_else(|_| defaults.fallback_host.clone());

        let central_host = std::env::var("AXENTIA_CENTRAL_HOST")
            .map(|host| normalize_host(&host))
            .unwrap_or_else(|_| {
                tracing::warn!(host = %fallback_host, "AXENTIA_CENTRAL_HOST not set; using the fallback host");
                fallback_host.clone()
            });

        let sign_in_path = std::env::var("AXENTIA_SIGN_IN_PATH").unwrap_or(defaults.sign_in_path);
        let app_url = std::env::var("AXENTIA_APP_URL").unwrap_or(defaults.app_url);
        let state_dir = std::env::var_os("AXENTIA_STATE_DIR")
            .map(PathBuf::from)
            .or(defaults.state_dir);

        Self {
            fallback_host,
            central_host,
            sign_in_path,
            app_url,
            state_dir,
        }
    }

    pub fn with_fallback_host(mut self, host: impl AsRef<str>) -> Self {
        self.fallback_host = normalize_host(host.as_ref());
        self
    }

    pub fn with_central_host(mut self, host: impl AsRef<str>) -> Self {
        self.central_host = normalize_host(host.as_ref());
        self
    }

    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = url.into();
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.state_dir = None;
        self
    }
}

fn normalize_host(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
