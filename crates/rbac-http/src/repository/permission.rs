use rbac_core::error::ConsoleResult;
use rbac_core::models::page::{PageInfo, PaginatedResult};
use rbac_core::models::permission::{
    CreatePermission, ListPermissions, Permission, UpdatePermission,
};
use rbac_core::repository::PermissionRepository;
use serde::Deserialize;

use super::{IdsRequest, paginated};
use crate::client::{ApiClient, ApiRequest};

#[derive(Deserialize)]
struct PermissionEnvelope {
    permission: Permission,
}

#[derive(Deserialize)]
struct PermissionsEnvelope {
    #[serde(default)]
    permissions: Vec<Permission>,
    page: Option<PageInfo>,
}

/// HTTP-backed [`PermissionRepository`].
#[derive(Clone)]
pub struct HttpPermissionRepository {
    client: ApiClient,
}

impl HttpPermissionRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl PermissionRepository for HttpPermissionRepository {
    async fn create(&self, input: CreatePermission) -> ConsoleResult<Permission> {
        let request = ApiRequest::post("/permission").json(&input)?;
        let envelope: PermissionEnvelope = self.client.send(request).await?;
        Ok(envelope.permission)
    }

    async fn get_by_id(&self, id: &str) -> ConsoleResult<Permission> {
        let envelope: PermissionEnvelope = self
            .client
            .send(ApiRequest::get("/permission").segment(id))
            .await?;
        Ok(envelope.permission)
    }

    async fn update(&self, input: UpdatePermission) -> ConsoleResult<()> {
        let request = ApiRequest::put("/permission").segment(&input.id).json(&input)?;
        self.client.send_ack(request).await
    }

    async fn delete(&self, id: &str) -> ConsoleResult<()> {
        self.client
            .send_ack(ApiRequest::delete("/permission").segment(id))
            .await
    }

    async fn batch_delete(&self, ids: Vec<String>) -> ConsoleResult<()> {
        let request = ApiRequest::post("/permissions/batch-delete").json(&IdsRequest { ids })?;
        self.client.send_ack(request).await
    }

    async fn list(&self, query: ListPermissions) -> ConsoleResult<PaginatedResult<Permission>> {
        let request = ApiRequest::get("/permissions")
            .query_opt("code", query.code)
            .query(query.page.to_query());
        let envelope: PermissionsEnvelope = self.client.send(request).await?;
        Ok(paginated(envelope.permissions, envelope.page))
    }

    async fn search(&self, keyword: &str) -> ConsoleResult<Vec<Permission>> {
        let request =
            ApiRequest::get("/permissions/search").query([("keyword", keyword.to_owned())]);
        let envelope: PermissionsEnvelope = self.client.send(request).await?;
        Ok(envelope.permissions)
    }

    async fn tree(&self) -> ConsoleResult<Vec<Permission>> {
        let envelope: PermissionsEnvelope = self
            .client
            .send(ApiRequest::get("/permissions/tree"))
            .await?;
        Ok(envelope.permissions)
    }
}
