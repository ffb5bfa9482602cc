//! Session lifecycle tests against in-memory authentication and role
//! backends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rbac_core::error::{AuthError, ConsoleError, ConsoleResult};
use rbac_core::models::page::PaginatedResult;
use rbac_core::models::permission::Permission;
use rbac_core::models::role::{CreateRole, ListRoles, Role, RolePermissionsChange, UpdateRole};
use rbac_core::models::session::{LoginRequest, LoginResponse, LogoutRequest, TokenPair};
use rbac_core::models::user::UserIdentity;
use rbac_core::repository::{AuthGateway, RoleRepository};
use rbac_core::{
    ACCESS_TOKEN_KEY, MemorySessionStorage, PermissionCode, PermissionSet, SessionStorage, catalog,
};
use rbac_session::{SessionConfig, SessionEvent, SessionService, SessionStore};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeAuth {
    roles: Vec<Role>,
    logout_fails: bool,
    verify_fails: bool,
    logouts: AtomicUsize,
}

impl FakeAuth {
    fn with_roles(roles: Vec<Role>) -> Self {
        Self {
            roles,
            logout_fails: false,
            verify_fails: false,
            logouts: AtomicUsize::new(0),
        }
    }

    fn identity(&self) -> UserIdentity {
        UserIdentity {
            user_id: "u1".into(),
            username: "admin".into(),
            name: "Administrator".into(),
            employee_id: "E001".into(),
            login_time: Utc::now(),
            groups: Vec::new(),
            roles: self.roles.clone(),
        }
    }
}

impl AuthGateway for &FakeAuth {
    async fn login(&self, input: LoginRequest) -> ConsoleResult<LoginResponse> {
        match input.password.as_str() {
            "secret" => Ok(LoginResponse {
                access_token: "access-1".into(),
                refresh_token: Some("refresh-1".into()),
                expire_time: None,
                user_info: self.identity(),
            }),
            "locked" => Err(AuthError::AccountLocked.into()),
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    async fn logout(&self, _input: LogoutRequest) -> ConsoleResult<()> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        if self.logout_fails {
            return Err(ConsoleError::Network("timed out".into()));
        }
        Ok(())
    }

    async fn refresh(&self, _refresh_token: &str) -> ConsoleResult<TokenPair> {
        Err(AuthError::TokenExpired.into())
    }

    async fn verify(&self, access_token: &str) -> ConsoleResult<UserIdentity> {
        if self.verify_fails || access_token != "access-1" {
            return Err(AuthError::TokenInvalid("unknown token".into()).into());
        }
        Ok(self.identity())
    }

    async fn check_permission(
        &self,
        _user_id: &str,
        code: &PermissionCode,
        _group_id: Option<&str>,
    ) -> ConsoleResult<bool> {
        if code == &catalog::ROLE_LIST {
            return Err(ConsoleError::Network("connection reset".into()));
        }
        Ok(code == &catalog::USER_LIST)
    }
}

#[derive(Default)]
struct FakeRoles {
    grants: HashMap<String, ConsoleResult<Vec<Permission>>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeRoles {
    fn grant(mut self, role_id: &str, codes: &[&str]) -> Self {
        self.grants
            .insert(role_id.into(), Ok(codes.iter().map(|c| permission(c)).collect()));
        self
    }

    fn failing(mut self, role_id: &str) -> Self {
        self.grants.insert(
            role_id.into(),
            Err(ConsoleError::Network("connection refused".into())),
        );
        self
    }

    fn fetched(&self) -> Vec<String> {
        let mut fetched = self.fetches.lock().unwrap().clone();
        fetched.sort();
        fetched
    }
}

impl RoleRepository for &FakeRoles {
    async fn create(&self, _input: CreateRole) -> ConsoleResult<Role> {
        unimplemented!()
    }

    async fn get_by_id(&self, _id: &str) -> ConsoleResult<Role> {
        unimplemented!()
    }

    async fn update(&self, _input: UpdateRole) -> ConsoleResult<()> {
        unimplemented!()
    }

    async fn delete(&self, _id: &str) -> ConsoleResult<()> {
        unimplemented!()
    }

    async fn batch_delete(&self, _ids: Vec<String>) -> ConsoleResult<()> {
        unimplemented!()
    }

    async fn list(&self, _query: ListRoles) -> ConsoleResult<PaginatedResult<Role>> {
        unimplemented!()
    }

    async fn search(&self, _keyword: &str) -> ConsoleResult<Vec<Role>> {
        unimplemented!()
    }

    async fn get_role_permissions(&self, role_id: &str) -> ConsoleResult<Vec<Permission>> {
        self.fetches.lock().unwrap().push(role_id.to_owned());
        self.grants
            .get(role_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn assign_permissions(&self, _input: RolePermissionsChange) -> ConsoleResult<()> {
        unimplemented!()
    }

    async fn remove_permissions(&self, _input: RolePermissionsChange) -> ConsoleResult<()> {
        unimplemented!()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn permission(code: &str) -> Permission {
    Permission {
        id: format!("p-{code}"),
        code: PermissionCode::parse(code).unwrap(),
        name: code.into(),
        description: None,
        create_time: None,
        update_time: None,
    }
}

fn role(id: &str, is_enabled: bool) -> Role {
    Role {
        id: id.into(),
        code: id.into(),
        name: id.into(),
        description: None,
        is_enabled,
        create_time: None,
        update_time: None,
    }
}

fn codes(raw: &[&str]) -> PermissionSet {
    raw.iter().map(|c| PermissionCode::parse(c).unwrap()).collect()
}

fn store(storage: &Arc<MemorySessionStorage>) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(storage.clone(), SessionConfig::default()))
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_login_resolves_role_permissions() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(vec![role("admin", true)]);
    let roles = FakeRoles::default().grant("admin", &["user:list", "user:create"]);
    let service = SessionService::new(store(&storage), &auth, &roles);
    let mut events = service.store().events();

    let session = service.login("admin", "secret").await.unwrap();

    assert!(session.is_authenticated);
    assert!(!session.loading);
    assert_eq!(session.permissions, codes(&["user:list", "user:create"]));
    assert_eq!(session.token.as_deref(), Some("access-1"));
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("access-1"));
    assert_eq!(service.store().snapshot(), session);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Authenticated {
            user_id: "u1".into()
        }
    );
}

#[tokio::test]
async fn overlapping_roles_are_merged_without_duplicates() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(vec![role("r1", true), role("r2", true)]);
    let roles = FakeRoles::default()
        .grant("r1", &["user:list", "user:create"])
        .grant("r2", &["user:create", "user:view"]);
    let service = SessionService::new(store(&storage), &auth, &roles);

    let session = service.login("admin", "secret").await.unwrap();

    assert_eq!(
        session.permissions,
        codes(&["user:list", "user:create", "user:view"])
    );
    assert_eq!(session.permissions.len(), 3);
}

#[tokio::test]
async fn zero_roles_grant_nothing() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(Vec::new());
    let roles = FakeRoles::default();
    let service = SessionService::new(store(&storage), &auth, &roles);

    let session = service.login("admin", "secret").await.unwrap();

    assert!(session.is_authenticated);
    assert!(session.permissions.is_empty());
    assert!(roles.fetched().is_empty());
}

#[tokio::test]
async fn disabled_and_repeated_roles_are_not_fetched() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(vec![
        role("viewer", true),
        role("editor", false),
        role("viewer", true),
    ]);
    let roles = FakeRoles::default()
        .grant("viewer", &["group:view"])
        .grant("editor", &["group:update"]);
    let service = SessionService::new(store(&storage), &auth, &roles);

    let session = service.login("admin", "secret").await.unwrap();

    assert_eq!(session.permissions, codes(&["group:view"]));
    assert_eq!(roles.fetched(), vec!["viewer"]);
}

#[tokio::test]
async fn any_failed_role_fetch_rejects_login() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(vec![role("r1", true), role("r2", true)]);
    let roles = FakeRoles::default()
        .grant("r1", &["user:list"])
        .failing("r2");
    let service = SessionService::new(store(&storage), &auth, &roles);

    let err = service.login("admin", "secret").await.unwrap_err();

    assert!(matches!(err, ConsoleError::Network(_)));
    let session = service.store().snapshot();
    assert!(!session.is_authenticated);
    assert!(session.permissions.is_empty());
    assert!(session.error.is_some());
    assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
}

#[tokio::test]
async fn failed_relogin_does_not_keep_the_previous_session() {
    let storage = Arc::new(MemorySessionStorage::new());
    let shared = store(&storage);
    let auth = FakeAuth::with_roles(vec![role("r1", true)]);
    let working = FakeRoles::default().grant("r1", &["user:list"]);
    let broken = FakeRoles::default().failing("r1");

    SessionService::new(Arc::clone(&shared), &auth, &working)
        .login("admin", "secret")
        .await
        .unwrap();
    let err = SessionService::new(Arc::clone(&shared), &auth, &broken)
        .login("admin", "secret")
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Network(_)));
    let session = shared.snapshot();
    assert!(!session.is_authenticated);
    assert_eq!(session.token, None);
    assert!(session.user.is_none());
    assert!(session.permissions.is_empty());
    assert!(session.error.is_some());
    assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
}

#[tokio::test(start_paused = true)]
async fn rejected_credentials_error_clears_itself() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(Vec::new());
    let roles = FakeRoles::default();
    let service = SessionService::new(store(&storage), &auth, &roles);

    let err = service.login("admin", "wrong").await.unwrap_err();
    assert_eq!(err, ConsoleError::Auth(AuthError::InvalidCredentials));

    let session = service.store().snapshot();
    assert!(!session.loading);
    assert_eq!(
        session.error.as_deref(),
        Some("Incorrect username or password")
    );

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert!(service.store().snapshot().error.is_some());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(service.store().snapshot().error, None);
}

#[tokio::test]
async fn locked_account_has_its_own_message() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(Vec::new());
    let roles = FakeRoles::default();
    let service = SessionService::new(store(&storage), &auth, &roles);

    let err = service.login("admin", "locked").await.unwrap_err();
    assert_eq!(err, ConsoleError::Auth(AuthError::AccountLocked));
    assert_eq!(
        service.store().snapshot().error.as_deref(),
        Some("This account is locked, contact an administrator")
    );

    service.dismiss_error();
    assert_eq!(service.store().snapshot().error, None);
}

#[tokio::test]
async fn login_is_refused_while_another_is_pending() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(Vec::new());
    let roles = FakeRoles::default();
    let service = SessionService::new(store(&storage), &auth, &roles);

    assert!(service.store().try_begin());
    let err = service.login("admin", "secret").await.unwrap_err();

    assert_eq!(err, ConsoleError::Auth(AuthError::LoginInProgress));
    assert!(service.store().snapshot().loading);
    assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth {
        logout_fails: true,
        ..FakeAuth::with_roles(vec![role("admin", true)])
    };
    let roles = FakeRoles::default().grant("admin", &["user:list"]);
    let service = SessionService::new(store(&storage), &auth, &roles);
    service.login("admin", "secret").await.unwrap();
    let mut events = service.store().events();

    service.logout().await;

    assert_eq!(auth.logouts.load(Ordering::SeqCst), 1);
    let session = service.store().snapshot();
    assert!(!session.is_authenticated);
    assert!(session.permissions.is_empty());
    assert_eq!(session.token, None);
    assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
}

#[tokio::test]
async fn logout_without_token_skips_server_call() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(Vec::new());
    let roles = FakeRoles::default();
    let service = SessionService::new(store(&storage), &auth, &roles);

    service.logout().await;

    assert_eq!(auth.logouts.load(Ordering::SeqCst), 0);
    assert!(!service.store().snapshot().is_authenticated);
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verify_without_token_is_unauthenticated() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(Vec::new());
    let roles = FakeRoles::default();
    let service = SessionService::new(store(&storage), &auth, &roles);

    assert_eq!(service.verify_session().await, None);
    assert!(!service.store().snapshot().loading);
}

#[tokio::test]
async fn verify_restores_persisted_session() {
    let storage = Arc::new(MemorySessionStorage::new());
    storage.set(ACCESS_TOKEN_KEY, "access-1".into());
    let auth = FakeAuth::with_roles(vec![role("admin", true)]);
    let roles = FakeRoles::default().grant("admin", &["group:list"]);
    let service = SessionService::new(store(&storage), &auth, &roles);

    let session = service.verify_session().await.unwrap();

    assert!(session.is_authenticated);
    assert_eq!(session.user_id(), Some("u1"));
    assert_eq!(session.permissions, codes(&["group:list"]));
}

#[tokio::test]
async fn failed_verification_drops_stored_token() {
    let storage = Arc::new(MemorySessionStorage::new());
    storage.set(ACCESS_TOKEN_KEY, "stale".into());
    let auth = FakeAuth::with_roles(Vec::new());
    let roles = FakeRoles::default();
    let service = SessionService::new(store(&storage), &auth, &roles);

    assert_eq!(service.verify_session().await, None);

    let session = service.store().snapshot();
    assert!(!session.is_authenticated);
    assert!(!session.loading);
    assert_eq!(session.token, None);
    assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
}

#[tokio::test]
async fn failed_permission_resolution_during_verify_drops_token() {
    let storage = Arc::new(MemorySessionStorage::new());
    storage.set(ACCESS_TOKEN_KEY, "access-1".into());
    let auth = FakeAuth::with_roles(vec![role("admin", true)]);
    let roles = FakeRoles::default().failing("admin");
    let service = SessionService::new(store(&storage), &auth, &roles);

    assert_eq!(service.verify_session().await, None);
    assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
}

// ---------------------------------------------------------------------------
// Server-side permission checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remote_check_reads_failures_as_denied() {
    let storage = Arc::new(MemorySessionStorage::new());
    let auth = FakeAuth::with_roles(Vec::new());
    let roles = FakeRoles::default();
    let service = SessionService::new(store(&storage), &auth, &roles);

    assert!(!service.check_remote(&catalog::USER_LIST, None).await);

    service.login("admin", "secret").await.unwrap();
    assert!(service.check_remote(&catalog::USER_LIST, None).await);
    assert!(!service.check_remote(&catalog::USER_VIEW, Some("g1")).await);
    assert!(!service.check_remote(&catalog::ROLE_LIST, None).await);
}
