//! Traits for the REST collaborators the console consumes.
//!
//! All operations are async. Implementations live in `rbac-http`; tests
//! substitute in-memory fakes.

use crate::error::ConsoleResult;
use crate::models::{
    group::{CreateGroup, Group, GroupRolesChange, ListGroups, UpdateGroup},
    page::PaginatedResult,
    permission::{CreatePermission, ListPermissions, Permission, PermissionCode, UpdatePermission},
    role::{CreateRole, ListRoles, Role, RolePermissionsChange, UpdateRole},
    session::{LoginRequest, LoginResponse, LogoutRequest, TokenPair},
    user::{
        CreateUser, ListUsers, ResetPassword, UpdatePassword, UpdateUser, User, UserGroupsChange,
        UserIdentity,
    },
};

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for a token pair and the user's identity.
    fn login(
        &self,
        input: LoginRequest,
    ) -> impl Future<Output = ConsoleResult<LoginResponse>> + Send;

    /// Invalidate the access token server-side.
    fn logout(&self, input: LogoutRequest) -> impl Future<Output = ConsoleResult<()>> + Send;

    /// Mint a new access token from a refresh token.
    fn refresh(&self, refresh_token: &str)
    -> impl Future<Output = ConsoleResult<TokenPair>> + Send;

    /// Resolve an access token back to the identity it was issued for.
    fn verify(
        &self,
        access_token: &str,
    ) -> impl Future<Output = ConsoleResult<UserIdentity>> + Send;

    /// Ask the server whether a user holds a permission, optionally within a
    /// group.
    fn check_permission(
        &self,
        user_id: &str,
        code: &PermissionCode,
        group_id: Option<&str>,
    ) -> impl Future<Output = ConsoleResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = ConsoleResult<User>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = ConsoleResult<User>> + Send;
    fn update(&self, input: UpdateUser) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn list(
        &self,
        query: ListUsers,
    ) -> impl Future<Output = ConsoleResult<PaginatedResult<User>>> + Send;

    fn update_password(
        &self,
        input: UpdatePassword,
    ) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn reset_password(&self, input: ResetPassword)
    -> impl Future<Output = ConsoleResult<()>> + Send;

    /// Groups the user belongs to.
    fn get_groups(&self, user_id: &str) -> impl Future<Output = ConsoleResult<Vec<Group>>> + Send;
    fn add_to_groups(
        &self,
        input: UserGroupsChange,
    ) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn remove_from_groups(
        &self,
        input: UserGroupsChange,
    ) -> impl Future<Output = ConsoleResult<()>> + Send;

    /// Every permission the server grants the user, optionally scoped to a
    /// group.
    fn get_all_permissions(
        &self,
        user_id: &str,
        group_id: Option<&str>,
    ) -> impl Future<Output = ConsoleResult<Vec<Permission>>> + Send;
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub trait GroupRepository: Send + Sync {
    fn create(&self, input: CreateGroup) -> impl Future<Output = ConsoleResult<Group>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = ConsoleResult<Group>> + Send;
    fn update(&self, input: UpdateGroup) -> impl Future<Output = ConsoleResult<()>> + Send;
    /// Delete a group. The server removes its descendants with it.
    fn delete(&self, id: &str) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn list(
        &self,
        query: ListGroups,
    ) -> impl Future<Output = ConsoleResult<PaginatedResult<Group>>> + Send;

    fn get_roles(&self, group_id: &str) -> impl Future<Output = ConsoleResult<Vec<Role>>> + Send;
    fn assign_roles(
        &self,
        input: GroupRolesChange,
    ) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn remove_roles(
        &self,
        input: GroupRolesChange,
    ) -> impl Future<Output = ConsoleResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Roles & permissions
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = ConsoleResult<Role>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = ConsoleResult<Role>> + Send;
    fn update(&self, input: UpdateRole) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn batch_delete(&self, ids: Vec<String>) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn list(
        &self,
        query: ListRoles,
    ) -> impl Future<Output = ConsoleResult<PaginatedResult<Role>>> + Send;
    fn search(&self, keyword: &str) -> impl Future<Output = ConsoleResult<Vec<Role>>> + Send;

    /// Get all permissions granted to a role.
    fn get_role_permissions(
        &self,
        role_id: &str,
    ) -> impl Future<Output = ConsoleResult<Vec<Permission>>> + Send;
    fn assign_permissions(
        &self,
        input: RolePermissionsChange,
    ) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn remove_permissions(
        &self,
        input: RolePermissionsChange,
    ) -> impl Future<Output = ConsoleResult<()>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = ConsoleResult<Permission>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = ConsoleResult<Permission>> + Send;
    fn update(&self, input: UpdatePermission) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn delete(&self, id: &str) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn batch_delete(&self, ids: Vec<String>) -> impl Future<Output = ConsoleResult<()>> + Send;
    fn list(
        &self,
        query: ListPermissions,
    ) -> impl Future<Output = ConsoleResult<PaginatedResult<Permission>>> + Send;
    fn search(&self, keyword: &str)
    -> impl Future<Output = ConsoleResult<Vec<Permission>>> + Send;
    /// Permissions arranged for the permission picker.
    fn tree(&self) -> impl Future<Output = ConsoleResult<Vec<Permission>>> + Send;
}
