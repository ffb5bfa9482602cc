use rbac_core::error::ConsoleResult;
use rbac_core::models::page::{PageInfo, PaginatedResult};
use rbac_core::models::permission::Permission;
use rbac_core::models::role::{CreateRole, ListRoles, Role, RolePermissionsChange, UpdateRole};
use rbac_core::repository::RoleRepository;
use serde::Deserialize;

use super::{IdsRequest, paginated};
use crate::client::{ApiClient, ApiRequest};

#[derive(Deserialize)]
struct RoleEnvelope {
    role: Role,
}

#[derive(Deserialize)]
struct RolesEnvelope {
    #[serde(default)]
    roles: Vec<Role>,
    page: Option<PageInfo>,
}

#[derive(Deserialize)]
struct PermissionsEnvelope {
    #[serde(default)]
    permissions: Vec<Permission>,
}

/// HTTP-backed [`RoleRepository`].
#[derive(Clone)]
pub struct HttpRoleRepository {
    client: ApiClient,
}

impl HttpRoleRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl RoleRepository for HttpRoleRepository {
    async fn create(&self, input: CreateRole) -> ConsoleResult<Role> {
        let request = ApiRequest::post("/role").json(&input)?;
        let envelope: RoleEnvelope = self.client.send(request).await?;
        Ok(envelope.role)
    }

    async fn get_by_id(&self, id: &str) -> ConsoleResult<Role> {
        let envelope: RoleEnvelope = self
            .client
            .send(ApiRequest::get("/role").segment(id))
            .await?;
        Ok(envelope.role)
    }

    async fn update(&self, input: UpdateRole) -> ConsoleResult<()> {
        let request = ApiRequest::put("/role").segment(&input.id).json(&input)?;
        self.client.send_ack(request).await
    }

    async fn delete(&self, id: &str) -> ConsoleResult<()> {
        self.client
            .send_ack(ApiRequest::delete("/role").segment(id))
            .await
    }

    async fn batch_delete(&self, ids: Vec<String>) -> ConsoleResult<()> {
        let request = ApiRequest::post("/roles/batch-delete").json(&IdsRequest { ids })?;
        self.client.send_ack(request).await
    }

    async fn list(&self, query: ListRoles) -> ConsoleResult<PaginatedResult<Role>> {
        let request = ApiRequest::get("/roles")
            .query_opt("code", query.code)
            .query_opt("isEnabled", query.is_enabled)
            .query(query.page.to_query());
        let envelope: RolesEnvelope = self.client.send(request).await?;
        Ok(paginated(envelope.roles, envelope.page))
    }

    async fn search(&self, keyword: &str) -> ConsoleResult<Vec<Role>> {
        let request = ApiRequest::get("/roles/search").query([("keyword", keyword.to_owned())]);
        let envelope: RolesEnvelope = self.client.send(request).await?;
        Ok(envelope.roles)
    }

    async fn get_role_permissions(&self, role_id: &str) -> ConsoleResult<Vec<Permission>> {
        let envelope: PermissionsEnvelope = self
            .client
            .send(ApiRequest::get("/role").segment(role_id).segment("permissions"))
            .await?;
        Ok(envelope.permissions)
    }

    async fn assign_permissions(&self, input: RolePermissionsChange) -> ConsoleResult<()> {
        let request = ApiRequest::post("/role/assign-permissions").json(&input)?;
        self.client.send_ack(request).await
    }

    async fn remove_permissions(&self, input: RolePermissionsChange) -> ConsoleResult<()> {
        let request = ApiRequest::post("/role/remove-permissions").json(&input)?;
        self.client.send_ack(request).await
    }
}
