//! User domain model and the identity carried by an authenticated session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::group::Group;
use super::page::PageRequest;
use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_enabled: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub username: String,
    pub name: String,
    pub employee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw initial password (hashed server-side).
    pub initial_password: String,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub employee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassword {
    pub user_id: String,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPassword {
    pub user_id: String,
    pub new_password: String,
}

/// Adds a user to, or removes a user from, a batch of groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroupsChange {
    pub user_id: String,
    pub group_ids: Vec<String>,
}

/// Filters for the user list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ListUsers {
    pub username: Option<String>,
    pub employee_id: Option<String>,
    pub is_enabled: Option<bool>,
    pub page: PageRequest,
}

/// The logged-in user as reported by the login and verify endpoints.
///
/// Owned by the session and replaced wholesale on every successful
/// login or verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: String,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub employee_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub login_time: DateTime<Utc>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub roles: Vec<Role>,
}
