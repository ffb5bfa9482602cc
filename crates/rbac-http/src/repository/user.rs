use rbac_core::error::ConsoleResult;
use rbac_core::models::group::Group;
use rbac_core::models::page::{PageInfo, PaginatedResult};
use rbac_core::models::permission::Permission;
use rbac_core::models::user::{
    CreateUser, ListUsers, ResetPassword, UpdatePassword, UpdateUser, User, UserGroupsChange,
};
use rbac_core::repository::UserRepository;
use serde::Deserialize;

use super::paginated;
use crate::client::{ApiClient, ApiRequest};

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct UsersEnvelope {
    #[serde(default)]
    users: Vec<User>,
    page: Option<PageInfo>,
}

#[derive(Deserialize)]
struct GroupsEnvelope {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Deserialize)]
struct PermissionsEnvelope {
    #[serde(default)]
    permissions: Vec<Permission>,
}

/// HTTP-backed [`UserRepository`].
#[derive(Clone)]
pub struct HttpUserRepository {
    client: ApiClient,
}

impl HttpUserRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl UserRepository for HttpUserRepository {
    async fn create(&self, input: CreateUser) -> ConsoleResult<User> {
        let request = ApiRequest::post("/user/create").json(&input)?;
        let envelope: UserEnvelope = self.client.send(request).await?;
        Ok(envelope.user)
    }

    async fn get_by_id(&self, id: &str) -> ConsoleResult<User> {
        let envelope: UserEnvelope = self
            .client
            .send(ApiRequest::get("/user/info").segment(id))
            .await?;
        Ok(envelope.user)
    }

    async fn update(&self, input: UpdateUser) -> ConsoleResult<()> {
        let request = ApiRequest::put("/user").segment(&input.id).json(&input)?;
        self.client.send_ack(request).await
    }

    async fn delete(&self, id: &str) -> ConsoleResult<()> {
        self.client
            .send_ack(ApiRequest::delete("/user").segment(id))
            .await
    }

    async fn list(&self, query: ListUsers) -> ConsoleResult<PaginatedResult<User>> {
        let request = ApiRequest::get("/users")
            .query_opt("username", query.username)
            .query_opt("employeeId", query.employee_id)
            .query_opt("isEnabled", query.is_enabled)
            .query(query.page.to_query());
        let envelope: UsersEnvelope = self.client.send(request).await?;
        Ok(paginated(envelope.users, envelope.page))
    }

    async fn update_password(&self, input: UpdatePassword) -> ConsoleResult<()> {
        let request = ApiRequest::put("/user")
            .segment(&input.user_id)
            .segment("password")
            .json(&input)?;
        self.client.send_ack(request).await
    }

    async fn reset_password(&self, input: ResetPassword) -> ConsoleResult<()> {
        let request = ApiRequest::put("/user")
            .segment(&input.user_id)
            .segment("reset-password")
            .json(&input)?;
        self.client.send_ack(request).await
    }

    async fn get_groups(&self, user_id: &str) -> ConsoleResult<Vec<Group>> {
        let envelope: GroupsEnvelope = self
            .client
            .send(ApiRequest::get("/user").segment(user_id).segment("groups"))
            .await?;
        Ok(envelope.groups)
    }

    async fn add_to_groups(&self, input: UserGroupsChange) -> ConsoleResult<()> {
        let request = ApiRequest::post("/user")
            .segment(&input.user_id)
            .segment("groups")
            .json(&input)?;
        self.client.send_ack(request).await
    }

    async fn remove_from_groups(&self, input: UserGroupsChange) -> ConsoleResult<()> {
        let request = ApiRequest::delete("/user")
            .segment(&input.user_id)
            .segment("groups")
            .json(&input)?;
        self.client.send_ack(request).await
    }

    async fn get_all_permissions(
        &self,
        user_id: &str,
        group_id: Option<&str>,
    ) -> ConsoleResult<Vec<Permission>> {
        let request = ApiRequest::get("/user")
            .segment(user_id)
            .segment("permissions")
            .query_opt("groupId", group_id);
        let envelope: PermissionsEnvelope = self.client.send(request).await?;
        Ok(envelope.permissions)
    }
}
