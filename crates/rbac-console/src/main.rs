//! RBAC Console: command-line entry point.
//!
//! Establishes a session (credentials from `RBAC_USERNAME`/`RBAC_PASSWORD`,
//! or a token from `RBAC_ACCESS_TOKEN` to verify), reports what the session
//! may reach, logs the group hierarchy and logs out.

use std::sync::Arc;

use anyhow::Context;
use rbac_core::{
    ACCESS_TOKEN_KEY, GroupDirectory, GroupTreeNode, MemorySessionStorage, SessionStorage,
    catalog,
};
use rbac_http::{ApiClient, HttpAuthGateway, HttpConfig, HttpGroupRepository, HttpRoleRepository};
use rbac_session::{RouteGuard, SessionConfig, SessionService, SessionStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rbac=info".parse()?))
        .json()
        .init();

    let http_config = HttpConfig::from_env()?;
    let session_config = SessionConfig::from_env();
    info!(base_url = %http_config.base_url, "starting RBAC console");

    let storage: Arc<dyn SessionStorage> = Arc::new(MemorySessionStorage::new());
    if let Ok(token) = std::env::var("RBAC_ACCESS_TOKEN") {
        storage.set(ACCESS_TOKEN_KEY, token);
    }
    let store = Arc::new(SessionStore::new(Arc::clone(&storage), session_config.clone()));
    let client = ApiClient::new(http_config, storage, store.clone())?;
    let sessions = SessionService::new(
        Arc::clone(&store),
        HttpAuthGateway::new(client.clone()),
        HttpRoleRepository::new(client.clone()),
    );

    let session = match (std::env::var("RBAC_USERNAME"), std::env::var("RBAC_PASSWORD")) {
        (Ok(username), Ok(password)) => sessions
            .login(&username, &password)
            .await
            .with_context(|| format!("login as {username} failed"))?,
        _ => sessions
            .verify_session()
            .await
            .context("no credentials given and no session to restore")?,
    };
    info!(
        user_id = session.user_id().unwrap_or_default(),
        permissions = session.permissions.len(),
        "session established"
    );

    let guard = RouteGuard::new(&session_config);
    for route in guard.routes() {
        let decision = guard.check(&session, &route.path);
        info!(path = %route.path, ?decision, "route access");
    }

    if session.has_permission(&catalog::GROUP_LIST) {
        let directory = GroupDirectory::new(HttpGroupRepository::new(client));
        match directory.tree().await {
            Ok(forest) => forest.iter().for_each(|root| log_tree(root, 0)),
            Err(err) => warn!(error = %err, "failed to load group hierarchy"),
        }
    }

    sessions.logout().await;
    info!("RBAC console finished");
    Ok(())
}

fn log_tree(node: &GroupTreeNode, depth: usize) {
    info!(
        depth,
        group_id = %node.group.id,
        name = %node.group.name,
        group_type = node.group.group_type.label(),
        "group"
    );
    for child in &node.children {
        log_tree(child, depth + 1);
    }
}
