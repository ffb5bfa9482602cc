//! Session domain model: who is logged in and what they may do.

use serde::{Deserialize, Serialize};

use super::permission::{PermissionCode, PermissionSet};
use super::user::UserIdentity;

/// Client-side view of the current authentication state.
///
/// Starts empty (optionally with a token rehydrated from storage), is
/// mutated by login, logout and verification, and is reset to empty on
/// logout or failed verification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub is_authenticated: bool,
    pub token: Option<String>,
    pub user: Option<UserIdentity>,
    pub permissions: PermissionSet,
    pub loading: bool,
    pub error: Option<String>,
}

impl Session {
    /// The unauthenticated state, carrying a token that still awaits
    /// verification if one was persisted.
    pub fn empty(token: Option<String>) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    pub fn has_permission(&self, code: &PermissionCode) -> bool {
        self.is_authenticated && self.permissions.has(code)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.user_id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
}

/// Successful login payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token expiry, Unix milliseconds.
    #[serde(default)]
    pub expire_time: Option<i64>,
    pub user_info: UserIdentity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub access_token: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// New token pair minted by the refresh endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expire_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPermissionRequest {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub permission_code: PermissionCode,
}
