//! Effective permission resolution from a user's roles.

use futures::future::try_join_all;
use rbac_core::PermissionSet;
use rbac_core::error::ConsoleResult;
use rbac_core::models::role::Role;
use rbac_core::repository::RoleRepository;
use tracing::debug;

/// Turns the roles attached to an identity into the flat, deduplicated set
/// of permission codes they grant.
pub struct PermissionResolver<R: RoleRepository> {
    roles: R,
}

impl<R: RoleRepository> PermissionResolver<R> {
    pub fn new(roles: R) -> Self {
        Self { roles }
    }

    pub fn repository(&self) -> &R {
        &self.roles
    }

    /// Fetch every enabled role's permissions concurrently and merge them.
    ///
    /// Fails as soon as any single fetch fails; a partial set is never
    /// returned. No roles means no permissions.
    pub async fn resolve(&self, roles: &[Role]) -> ConsoleResult<PermissionSet> {
        let mut role_ids: Vec<&str> = Vec::with_capacity(roles.len());
        for role in roles {
            if !role.is_enabled {
                debug!(role_id = %role.id, "skipping disabled role");
                continue;
            }
            if !role_ids.contains(&role.id.as_str()) {
                role_ids.push(&role.id);
            }
        }

        if role_ids.is_empty() {
            return Ok(PermissionSet::new());
        }

        let grants = try_join_all(
            role_ids
                .iter()
                .map(|id| self.roles.get_role_permissions(id)),
        )
        .await?;

        let permissions: PermissionSet = grants
            .into_iter()
            .flatten()
            .map(|permission| permission.code)
            .collect();
        debug!(
            roles = role_ids.len(),
            permissions = permissions.len(),
            "resolved effective permissions"
        );
        Ok(permissions)
    }
}
