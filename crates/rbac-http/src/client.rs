//! The API client: bearer attachment, envelope decoding and the
//! refresh-then-retry-once protocol.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use rbac_core::error::{AuthError, BaseResponse, ConsoleError, ConsoleResult, ErrorCode};
use rbac_core::{ACCESS_TOKEN_KEY, SessionListener, SessionStorage};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::barrier::RefreshBarrier;
use crate::config::HttpConfig;
use crate::repository::auth;

/// One logical API call. The bearer token is not part of the request; it
/// is read from session storage each time the request is sent.
///
/// The target is kept as path segments and percent-encoded only when the
/// URL is built, so ids added with [`segment`](Self::segment) can never
/// change the route.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
    refresh_on_401: bool,
}

impl ApiRequest {
    /// Start a request for a fixed route such as `/auth/login`.
    pub fn new(method: Method, route: &str) -> Self {
        Self {
            method,
            segments: split_route(route),
            query: Vec::new(),
            body: None,
            refresh_on_401: true,
        }
    }

    pub fn get(route: &str) -> Self {
        Self::new(Method::GET, route)
    }

    pub fn post(route: &str) -> Self {
        Self::new(Method::POST, route)
    }

    pub fn put(route: &str) -> Self {
        Self::new(Method::PUT, route)
    }

    pub fn delete(route: &str) -> Self {
        Self::new(Method::DELETE, route)
    }

    /// Append one path segment, typically an id. It is sent encoded.
    pub fn segment(mut self, value: impl Into<String>) -> Self {
        self.segments.push(value.into());
        self
    }

    pub fn query(mut self, pairs: impl IntoIterator<Item = (&'static str, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Add a query pair only when `value` is present.
    pub fn query_opt(mut self, key: &'static str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.query.push((key, value.to_string()));
        }
        self
    }

    pub fn json(mut self, body: &impl Serialize) -> ConsoleResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ConsoleError::Decode(format!("request body for {}: {e}", self.path())))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Opt this request out of the 401 refresh protocol.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_401 = false;
        self
    }

    /// The unencoded path, for logs and error messages.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

fn split_route(route: &str) -> Vec<String> {
    route
        .split('/')
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `base` with `segments` appended, each percent-encoded.
fn endpoint(base: &Url, segments: &[String]) -> ConsoleResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ConsoleError::Config(format!("base url {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

struct Inner {
    http: reqwest::Client,
    cookies: Arc<Jar>,
    base_url: Url,
    refresh_url: Url,
    config: HttpConfig,
    storage: Arc<dyn SessionStorage>,
    listener: Arc<dyn SessionListener>,
    barrier: RefreshBarrier,
}

/// Cheaply cloneable handle to the shared HTTP client.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(
        config: HttpConfig,
        storage: Arc<dyn SessionStorage>,
        listener: Arc<dyn SessionListener>,
    ) -> ConsoleResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ConsoleError::Config(format!("invalid base url {}: {e}", config.base_url))
        })?;
        let refresh_url = endpoint(&base_url, &split_route(auth::REFRESH_PATH))?;

        let cookies = Arc::new(Jar::default());
        let mut builder = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| ConsoleError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                cookies,
                base_url,
                refresh_url,
                config,
                storage,
                listener,
                barrier: RefreshBarrier::default(),
            }),
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.inner.config
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.storage.get(ACCESS_TOKEN_KEY)
    }

    /// The refresh token the server last set as a cookie.
    pub fn refresh_token(&self) -> Option<String> {
        let header = self.inner.cookies.cookies(&self.inner.refresh_url)?;
        let raw = header.to_str().ok()?;
        raw.split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.inner.config.refresh_cookie_name)
            .map(|(_, value)| value.to_owned())
            .filter(|value| !value.is_empty())
    }

    /// Send a request and decode the payload of its response envelope.
    ///
    /// A 401 triggers one token refresh (shared with any concurrent 401s)
    /// followed by one retry. If the stored token already changed while the
    /// request was in flight, the retry uses it without refreshing again.
    /// If the refresh fails the session is ended and the refresh error is
    /// returned.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> ConsoleResult<T> {
        let path = request.path();
        let (response, sent_with) = self.dispatch(&request, &path).await?;
        if response.status() != StatusCode::UNAUTHORIZED || !request.refresh_on_401 {
            return read_body(&path, response).await;
        }

        match self.access_token() {
            Some(current) if sent_with.as_deref() != Some(current.as_str()) => {
                debug!(path = %path, "access token replaced while in flight, retrying");
            }
            _ => {
                debug!(path = %path, "access token rejected, refreshing");
                self.refresh_access_token().await?;
            }
        }
        let (retried, _) = self.dispatch(&request, &path).await?;
        read_body(&path, retried).await
    }

    /// Send a request whose response carries no payload beyond `base`.
    pub async fn send_ack(&self, request: ApiRequest) -> ConsoleResult<()> {
        self.send::<IgnoredAny>(request).await.map(|_| ())
    }

    /// Send once with the token stored right now, returning the response
    /// together with the token it carried.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        path: &str,
    ) -> ConsoleResult<(Response, Option<String>)> {
        let url = endpoint(&self.inner.base_url, &request.segments)?;
        let mut builder = self.inner.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        let token = self.access_token();
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(method = %request.method, path, error = %e, "request failed");
            transport_error(e)
        })?;
        Ok((response, token))
    }

    async fn refresh_access_token(&self) -> ConsoleResult<String> {
        self.inner
            .barrier
            .run(|| self.exchange_refresh_token())
            .await
    }

    fn exchange_refresh_token(&self) -> BoxFuture<'static, ConsoleResult<String>> {
        let client = self.clone();
        async move {
            let outcome = match client.refresh_token() {
                Some(refresh_token) => auth::refresh_tokens(&client, &refresh_token)
                    .await
                    .map(|pair| pair.access_token),
                None => Err(AuthError::MissingRefreshToken.into()),
            };

            match outcome {
                Ok(access_token) => {
                    client
                        .inner
                        .storage
                        .set(ACCESS_TOKEN_KEY, access_token.clone());
                    client.inner.listener.token_refreshed(&access_token);
                    info!("access token refreshed");
                    Ok(access_token)
                }
                Err(err) => {
                    warn!(error = %err, "token refresh failed, ending session");
                    client.inner.storage.remove(ACCESS_TOKEN_KEY);
                    client.inner.listener.session_expired();
                    Err(err)
                }
            }
        }
        .boxed()
    }
}

#[derive(Deserialize)]
struct BaseOnly {
    #[serde(default)]
    base: Option<BaseResponse>,
}

async fn read_body<T: DeserializeOwned>(path: &str, response: Response) -> ConsoleResult<T> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(transport_error)?;
    let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };

    let base = serde_json::from_slice::<BaseOnly>(body)
        .ok()
        .and_then(|b| b.base);
    let rejected = base.as_ref().is_some_and(|b| !b.code.is_success());
    if !status.is_success() || rejected {
        let err = map_error(status, base, path);
        debug!(path, %status, error = %err, "request rejected");
        return Err(err);
    }

    serde_json::from_slice(body).map_err(|e| ConsoleError::Decode(format!("{path}: {e}")))
}

fn transport_error(err: reqwest::Error) -> ConsoleError {
    if err.is_timeout() {
        ConsoleError::Network(format!("request timed out: {err}"))
    } else {
        ConsoleError::Network(err.to_string())
    }
}

/// Translate a rejected response into the console error taxonomy.
pub(crate) fn map_error(status: StatusCode, base: Option<BaseResponse>, path: &str) -> ConsoleError {
    let (code, message) = match base {
        Some(base) => (Some(base.code), base.message),
        None => (None, String::new()),
    };
    let or_status = |message: String| {
        if message.is_empty() {
            status.canonical_reason().unwrap_or("request rejected").to_owned()
        } else {
            message
        }
    };

    match code {
        Some(ErrorCode::AuthFailed) => AuthError::InvalidCredentials.into(),
        Some(ErrorCode::AccountLocked) => AuthError::AccountLocked.into(),
        Some(ErrorCode::AccountDisabled) => AuthError::AccountDisabled.into(),
        Some(ErrorCode::InvalidToken) => AuthError::TokenInvalid(or_status(message)).into(),
        Some(ErrorCode::TokenExpired) => AuthError::TokenExpired.into(),
        Some(ErrorCode::InvalidParam) if status == StatusCode::UNAUTHORIZED => {
            AuthError::InvalidParam(message).into()
        }
        Some(ErrorCode::InvalidParam) => ConsoleError::validation("request", or_status(message)),
        Some(ErrorCode::ResourceNotFound) => ConsoleError::NotFound {
            resource: path.to_owned(),
        },
        Some(ErrorCode::PermissionDenied) => ConsoleError::PermissionDenied(or_status(message)),
        Some(ErrorCode::ResourceExist) => ConsoleError::Conflict(or_status(message)),
        _ if status == StatusCode::NOT_FOUND => ConsoleError::NotFound {
            resource: path.to_owned(),
        },
        _ if status == StatusCode::FORBIDDEN => ConsoleError::PermissionDenied(or_status(message)),
        _ if status == StatusCode::UNAUTHORIZED => {
            AuthError::TokenInvalid(or_status(message)).into()
        }
        Some(code) => ConsoleError::Server {
            code,
            message: or_status(message),
        },
        None => ConsoleError::Server {
            code: ErrorCode::Unknown(i64::from(status.as_u16())),
            message: or_status(message),
        },
    }
}
