//! Login, logout and session verification.

use std::sync::Arc;

use rbac_core::error::{AuthError, ConsoleResult};
use rbac_core::models::session::{LoginRequest, LogoutRequest};
use rbac_core::repository::{AuthGateway, RoleRepository};
use rbac_core::{ACCESS_TOKEN_KEY, PermissionCode, Session};
use tracing::{info, warn};

use crate::resolver::PermissionResolver;
use crate::store::SessionStore;

/// Drives the session lifecycle against the authentication endpoints.
///
/// State transitions: `idle -> pending -> {authenticated, error}` on login,
/// `authenticated -> idle` on logout. Every transition is published through
/// the injected [`SessionStore`].
pub struct SessionService<A: AuthGateway, R: RoleRepository> {
    store: Arc<SessionStore>,
    auth: A,
    resolver: PermissionResolver<R>,
}

impl<A: AuthGateway, R: RoleRepository> SessionService<A, R> {
    pub fn new(store: Arc<SessionStore>, auth: A, roles: R) -> Self {
        Self {
            store,
            auth,
            resolver: PermissionResolver::new(roles),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// Authenticate with credentials and resolve the effective permissions.
    ///
    /// Refused with [`AuthError::LoginInProgress`] while another login is
    /// pending. On any failure the session stays unauthenticated and its
    /// `error` carries a user-facing message.
    pub async fn login(&self, username: &str, password: &str) -> ConsoleResult<Session> {
        if !self.store.try_begin() {
            return Err(AuthError::LoginInProgress.into());
        }
        info!(username, "login started");

        match self.establish(username, password).await {
            Ok(session) => {
                info!(
                    username,
                    permissions = session.permissions.len(),
                    "login succeeded"
                );
                Ok(session)
            }
            Err(err) => {
                warn!(username, error = %err, "login failed");
                self.store.fail(err.user_message());
                Err(err)
            }
        }
    }

    async fn establish(&self, username: &str, password: &str) -> ConsoleResult<Session> {
        let response = self
            .auth
            .login(LoginRequest {
                username: username.to_owned(),
                password: password.to_owned(),
                client_id: None,
                device_info: None,
            })
            .await?;

        // Role permission lookups are authenticated requests.
        let storage = self.store.storage();
        storage.set(ACCESS_TOKEN_KEY, response.access_token.clone());

        let permissions = match self.resolver.resolve(&response.user_info.roles).await {
            Ok(permissions) => permissions,
            Err(err) => {
                // Storage no longer matches any earlier session; drop both.
                self.store.reset();
                return Err(err);
            }
        };

        // A refresh during resolution may have replaced the token.
        let token = self.store.access_token().unwrap_or(response.access_token);
        Ok(self
            .store
            .authenticate(token, response.user_info, permissions))
    }

    /// End the session. The server call is best-effort; local state is
    /// cleared regardless of its outcome.
    pub async fn logout(&self) {
        let session = self.store.snapshot();
        if let Some(access_token) = self.store.access_token() {
            let request = LogoutRequest {
                access_token,
                user_id: session.user_id().unwrap_or_default().to_owned(),
            };
            if let Err(err) = self.auth.logout(request).await {
                warn!(error = %err, "server logout failed, clearing local session anyway");
            }
        }
        self.store.logged_out();
    }

    /// Re-establish the session from a persisted token.
    ///
    /// Returns `None` when there is no token or when verification or
    /// permission resolution fails; the stored token is dropped in the
    /// latter case.
    pub async fn verify_session(&self) -> Option<Session> {
        let Some(token) = self.store.access_token() else {
            self.store.reset();
            return None;
        };

        self.store.mark_loading();
        match self.restore(&token).await {
            Ok(session) => {
                info!(user_id = session.user_id().unwrap_or_default(), "session restored");
                Some(session)
            }
            Err(err) => {
                warn!(error = %err, "session verification failed, clearing stored token");
                self.store.reset();
                None
            }
        }
    }

    async fn restore(&self, token: &str) -> ConsoleResult<Session> {
        let user = self.auth.verify(token).await?;
        let permissions = self.resolver.resolve(&user.roles).await?;
        let token = self
            .store
            .access_token()
            .unwrap_or_else(|| token.to_owned());
        Ok(self.store.authenticate(token, user, permissions))
    }

    /// Ask the server whether the current user holds `code`, optionally
    /// within a group. Any failure, including having no session, reads as
    /// `false`.
    pub async fn check_remote(&self, code: &PermissionCode, group_id: Option<&str>) -> bool {
        let session = self.store.snapshot();
        let Some(user_id) = session.user_id().filter(|_| session.is_authenticated) else {
            return false;
        };
        match self.auth.check_permission(user_id, code, group_id).await {
            Ok(granted) => granted,
            Err(err) => {
                warn!(%code, error = %err, "permission check failed");
                false
            }
        }
    }

    /// Clear the displayed login error before its timeout.
    pub fn dismiss_error(&self) {
        self.store.clear_error();
    }
}
