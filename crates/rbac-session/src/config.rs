//! Session configuration.

use std::time::Duration;

/// Configuration for the session layer.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a login error stays on the session before it clears
    /// itself, in seconds (default: 5).
    pub error_display_secs: u64,
    /// Where unauthenticated navigation is sent.
    pub login_path: String,
    /// Where navigation lacking a permission is sent.
    pub forbidden_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            error_display_secs: 5,
            login_path: "/login".into(),
            forbidden_path: "/403".into(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `RBAC_ERROR_DISPLAY_SECS` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = std::env::var("RBAC_ERROR_DISPLAY_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.error_display_secs = secs;
        }
        config
    }

    pub fn error_display(&self) -> Duration {
        Duration::from_secs(self.error_display_secs)
    }
}
