//! HTTP client configuration.

use std::time::Duration;

use rbac_core::error::{ConsoleError, ConsoleResult};

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Prefix every endpoint path is appended to.
    pub base_url: String,
    /// Transport-level timeout applied to every request (default: 10).
    pub request_timeout_secs: u64,
    /// Name of the cookie the server stores the refresh token in.
    pub refresh_cookie_name: String,
    pub user_agent: String,
    /// Honour `HTTP(S)_PROXY` from the environment (default: true).
    pub use_system_proxy: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api/v1".into(),
            request_timeout_secs: 10,
            refresh_cookie_name: "refreshToken".into(),
            user_agent: concat!("rbac-console/", env!("CARGO_PKG_VERSION")).into(),
            use_system_proxy: true,
        }
    }
}

impl HttpConfig {
    /// Defaults overridden by `RBAC_API_BASE_URL` and
    /// `RBAC_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> ConsoleResult<Self> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("RBAC_API_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(raw) = std::env::var("RBAC_HTTP_TIMEOUT_SECS") {
            config.request_timeout_secs = raw.parse().map_err(|_| {
                ConsoleError::Config(format!("RBAC_HTTP_TIMEOUT_SECS is not a number: {raw}"))
            })?;
        }
        Ok(config)
    }

    /// Shorthand for a default config pointed at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
