use rbac_core::error::ConsoleResult;
use rbac_core::models::group::{CreateGroup, Group, GroupRolesChange, ListGroups, UpdateGroup};
use rbac_core::models::page::{PageInfo, PaginatedResult};
use rbac_core::models::role::Role;
use rbac_core::repository::GroupRepository;
use serde::Deserialize;

use super::paginated;
use crate::client::{ApiClient, ApiRequest};

#[derive(Deserialize)]
struct GroupEnvelope {
    group: Group,
}

#[derive(Deserialize)]
struct GroupsEnvelope {
    #[serde(default)]
    groups: Vec<Group>,
    page: Option<PageInfo>,
}

#[derive(Deserialize)]
struct RolesEnvelope {
    #[serde(default)]
    roles: Vec<Role>,
}

/// HTTP-backed [`GroupRepository`]. Hierarchy rules are enforced by
/// [`GroupDirectory`](rbac_core::GroupDirectory) before calls reach it.
#[derive(Clone)]
pub struct HttpGroupRepository {
    client: ApiClient,
}

impl HttpGroupRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl GroupRepository for HttpGroupRepository {
    async fn create(&self, input: CreateGroup) -> ConsoleResult<Group> {
        let request = ApiRequest::post("/group").json(&input)?;
        let envelope: GroupEnvelope = self.client.send(request).await?;
        Ok(envelope.group)
    }

    async fn get_by_id(&self, id: &str) -> ConsoleResult<Group> {
        let envelope: GroupEnvelope = self
            .client
            .send(ApiRequest::get("/group").segment(id))
            .await?;
        Ok(envelope.group)
    }

    async fn update(&self, input: UpdateGroup) -> ConsoleResult<()> {
        let request = ApiRequest::put("/group").segment(&input.id).json(&input)?;
        self.client.send_ack(request).await
    }

    async fn delete(&self, id: &str) -> ConsoleResult<()> {
        self.client
            .send_ack(ApiRequest::delete("/group").segment(id))
            .await
    }

    async fn list(&self, query: ListGroups) -> ConsoleResult<PaginatedResult<Group>> {
        let request = ApiRequest::get("/groups")
            .query_opt("code", query.code)
            .query_opt("isEnabled", query.is_enabled)
            .query_opt("parentId", query.parent_id)
            .query_opt("type", query.group_type.map(u8::from))
            .query(query.page.to_query());
        let envelope: GroupsEnvelope = self.client.send(request).await?;
        Ok(paginated(envelope.groups, envelope.page))
    }

    async fn get_roles(&self, group_id: &str) -> ConsoleResult<Vec<Role>> {
        let envelope: RolesEnvelope = self
            .client
            .send(ApiRequest::get("/group").segment(group_id).segment("roles"))
            .await?;
        Ok(envelope.roles)
    }

    async fn assign_roles(&self, input: GroupRolesChange) -> ConsoleResult<()> {
        let request = ApiRequest::post("/group")
            .segment(&input.group_id)
            .segment("roles")
            .json(&input)?;
        self.client.send_ack(request).await
    }

    async fn remove_roles(&self, input: GroupRolesChange) -> ConsoleResult<()> {
        let request = ApiRequest::delete("/group")
            .segment(&input.group_id)
            .segment("roles")
            .json(&input)?;
        self.client.send_ack(request).await
    }
}
