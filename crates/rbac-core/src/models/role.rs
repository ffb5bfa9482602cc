//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::PageRequest;

/// A role as returned by the role endpoints and embedded in login
/// responses. Granted permissions are looked up separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub code: String,
    pub name: String,
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
pub struct CreateRole {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRole {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_enabled: bool,
}

/// Filters for the role list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ListRoles {
    pub code: Option<String>,
    pub is_enabled: Option<bool>,
    pub page: PageRequest,
}

/// Grants or revokes a batch of permissions on one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionsChange {
    pub role_id: String,
    pub permission_ids: Vec<String>,
}
