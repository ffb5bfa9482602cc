use rbac_core::error::ConsoleResult;
use rbac_core::models::session::{
    CheckPermissionRequest, LoginRequest, LoginResponse, LogoutRequest, RefreshTokenRequest,
    TokenPair,
};
use rbac_core::models::user::UserIdentity;
use rbac_core::repository::AuthGateway;
use rbac_core::PermissionCode;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiRequest};

const LOGIN_PATH: &str = "/auth/login";
const LOGOUT_PATH: &str = "/auth/logout";
pub(crate) const REFRESH_PATH: &str = "/auth/refresh";
const VERIFY_PATH: &str = "/auth/verify";
const CHECK_PERMISSION_PATH: &str = "/auth/check-permission";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyEnvelope {
    user_info: UserIdentity,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckPermissionEnvelope {
    has_permission: bool,
}

/// Exchange a refresh token for a new token pair. Never itself subject to
/// the refresh protocol.
pub(crate) async fn refresh_tokens(
    client: &ApiClient,
    refresh_token: &str,
) -> ConsoleResult<TokenPair> {
    let request = ApiRequest::post(REFRESH_PATH)
        .json(&RefreshTokenRequest {
            refresh_token: refresh_token.to_owned(),
            client_id: None,
        })?
        .without_refresh();
    client.send(request).await
}

/// HTTP-backed [`AuthGateway`].
#[derive(Clone)]
pub struct HttpAuthGateway {
    client: ApiClient,
}

impl HttpAuthGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl AuthGateway for HttpAuthGateway {
    async fn login(&self, input: LoginRequest) -> ConsoleResult<LoginResponse> {
        let request = ApiRequest::post(LOGIN_PATH).json(&input)?.without_refresh();
        self.client.send(request).await
    }

    async fn logout(&self, input: LogoutRequest) -> ConsoleResult<()> {
        let request = ApiRequest::post(LOGOUT_PATH).json(&input)?.without_refresh();
        self.client.send_ack(request).await
    }

    async fn refresh(&self, refresh_token: &str) -> ConsoleResult<TokenPair> {
        refresh_tokens(&self.client, refresh_token).await
    }

    async fn verify(&self, access_token: &str) -> ConsoleResult<UserIdentity> {
        let request = ApiRequest::post(VERIFY_PATH)
            .json(&VerifyRequest { access_token })?
            .without_refresh();
        let envelope: VerifyEnvelope = self.client.send(request).await?;
        Ok(envelope.user_info)
    }

    async fn check_permission(
        &self,
        user_id: &str,
        code: &PermissionCode,
        group_id: Option<&str>,
    ) -> ConsoleResult<bool> {
        let request = ApiRequest::post(CHECK_PERMISSION_PATH).json(&CheckPermissionRequest {
            user_id: user_id.to_owned(),
            group_id: group_id.map(str::to_owned),
            permission_code: code.clone(),
        })?;
        let envelope: CheckPermissionEnvelope = self.client.send(request).await?;
        Ok(envelope.has_permission)
    }
}
