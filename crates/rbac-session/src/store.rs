//! The single source of truth for "who is logged in and what can they do".

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rbac_core::models::user::UserIdentity;
use rbac_core::{ACCESS_TOKEN_KEY, PermissionSet, Session, SessionListener, SessionStorage};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::config::SessionConfig;

const EVENT_CAPACITY: usize = 16;

/// Session transitions that navigation consumers react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Authenticated { user_id: String },
    LoggedOut,
    /// The session was lost mid-flight; navigate to `redirect_to`.
    LoginRequired { redirect_to: String },
}

/// Owned session state container, injected into every consumer.
///
/// State changes are published through a `watch` channel (current value)
/// and a `broadcast` channel (discrete events). The access token itself is
/// mirrored into [`SessionStorage`] so the HTTP layer reads it at send
/// time.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
    error_generation: AtomicU64,
    config: SessionConfig,
}

impl SessionStore {
    /// Create the store in its empty state, rehydrating a persisted access
    /// token if one exists. The token still has to be verified before the
    /// session counts as authenticated.
    pub fn new(storage: Arc<dyn SessionStorage>, config: SessionConfig) -> Self {
        let token = storage.get(ACCESS_TOKEN_KEY);
        let (state, _) = watch::channel(Session::empty(token));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            state,
            events,
            error_generation: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The persisted access token, read fresh from storage.
    pub fn access_token(&self) -> Option<String> {
        self.storage.get(ACCESS_TOKEN_KEY)
    }

    /// Enter the pending state for a login. Returns `false` when another
    /// login is already pending, leaving the state untouched.
    pub fn try_begin(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.loading {
                return false;
            }
            s.loading = true;
            s.error = None;
            true
        })
    }

    /// Enter the pending state for a verification.
    pub fn mark_loading(&self) {
        self.state.send_modify(|s| s.loading = true);
    }

    /// Store the token and resolved identity, and mark the session
    /// authenticated.
    pub fn authenticate(
        &self,
        token: String,
        user: UserIdentity,
        permissions: PermissionSet,
    ) -> Session {
        self.storage.set(ACCESS_TOKEN_KEY, token.clone());
        let user_id = user.user_id.clone();
        self.state.send_replace(Session {
            is_authenticated: true,
            token: Some(token),
            user: Some(user),
            permissions,
            loading: false,
            error: None,
        });
        let _ = self.events.send(SessionEvent::Authenticated { user_id });
        self.snapshot()
    }

    /// Leave the pending state with a user-facing error. The error clears
    /// itself after the configured display time unless it is replaced or
    /// dismissed first.
    pub fn fail(self: &Arc<Self>, message: String) {
        let generation = self.error_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(message);
        });

        let store = Arc::clone(self);
        let delay = self.config.error_display();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if store.error_generation.load(Ordering::SeqCst) == generation {
                debug!("login error display time elapsed");
                store.clear_error();
            }
        });
    }

    pub fn clear_error(&self) {
        self.error_generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Drop the token and return to the empty, unauthenticated state.
    pub fn reset(&self) {
        self.storage.remove(ACCESS_TOKEN_KEY);
        self.state.send_replace(Session::empty(None));
    }

    pub(crate) fn logged_out(&self) {
        self.reset();
        let _ = self.events.send(SessionEvent::LoggedOut);
        info!("session cleared after logout");
    }
}

impl SessionListener for SessionStore {
    fn token_refreshed(&self, access_token: &str) {
        self.storage.set(ACCESS_TOKEN_KEY, access_token.to_owned());
        self.state
            .send_modify(|s| s.token = Some(access_token.to_owned()));
    }

    fn session_expired(&self) {
        self.reset();
        let _ = self.events.send(SessionEvent::LoginRequired {
            redirect_to: self.config.login_path.clone(),
        });
        info!(redirect_to = %self.config.login_path, "session expired; login required");
    }
}

#[cfg(test)]
mod tests {
    use rbac_core::MemorySessionStorage;

    use super::*;

    fn store_with(token: Option<&str>) -> Arc<SessionStore> {
        let storage = Arc::new(MemorySessionStorage::new());
        if let Some(token) = token {
            storage.set(ACCESS_TOKEN_KEY, token.into());
        }
        Arc::new(SessionStore::new(storage, SessionConfig::default()))
    }

    #[test]
    fn starts_empty_with_rehydrated_token() {
        let store = store_with(Some("persisted"));
        let session = store.snapshot();
        assert!(!session.is_authenticated);
        assert_eq!(session.token.as_deref(), Some("persisted"));
        assert!(session.permissions.is_empty());
    }

    #[test]
    fn second_begin_is_refused_while_pending() {
        let store = store_with(None);
        assert!(store.try_begin());
        assert!(!store.try_begin());
        assert!(store.snapshot().loading);
    }

    #[test]
    fn session_expiry_resets_and_requests_login() {
        let store = store_with(Some("stale"));
        let mut events = store.events();

        store.session_expired();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.snapshot(), Session::empty(None));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::LoginRequired {
                redirect_to: "/login".into()
            }
        );
    }

    #[test]
    fn refreshed_token_is_visible_to_storage_and_state() {
        let store = store_with(Some("old"));
        store.token_refreshed("new");
        assert_eq!(store.access_token().as_deref(), Some("new"));
        assert_eq!(store.snapshot().token.as_deref(), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn error_clears_after_display_time() {
        let store = store_with(None);
        store.try_begin();
        store.fail("bad password".into());
        assert_eq!(store.snapshot().error.as_deref(), Some("bad password"));

        tokio::time::sleep(std::time::Duration::from_secs(4)).await;
        assert!(store.snapshot().error.is_some());

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(store.snapshot().error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_error_outlives_older_timer() {
        let store = store_with(None);
        store.fail("first".into());
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        store.fail("second".into());

        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        assert_eq!(store.snapshot().error.as_deref(), Some("second"));

        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        assert_eq!(store.snapshot().error, None);
    }

    #[tokio::test]
    async fn dismissal_clears_immediately() {
        let store = store_with(None);
        store.fail("oops".into());
        store.clear_error();
        assert_eq!(store.snapshot().error, None);
    }
}
