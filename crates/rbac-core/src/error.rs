//! Error types for the RBAC console.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result codes carried in the `base.code` field of every API response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ErrorCode {
    Success,
    InvalidParam,
    ResourceNotFound,
    ResourceExist,
    PermissionDenied,
    SystemError,
    DbError,
    AuthFailed,
    InvalidToken,
    TokenExpired,
    AccountLocked,
    AccountDisabled,
    /// A code outside the closed set this client knows about.
    Unknown(i64),
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::InvalidParam,
            2 => Self::ResourceNotFound,
            3 => Self::ResourceExist,
            4 => Self::PermissionDenied,
            5 => Self::SystemError,
            6 => Self::DbError,
            7 => Self::AuthFailed,
            8 => Self::InvalidToken,
            9 => Self::TokenExpired,
            10 => Self::AccountLocked,
            11 => Self::AccountDisabled,
            other => Self::Unknown(other),
        }
    }
}

impl From<ErrorCode> for i64 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Success => 0,
            ErrorCode::InvalidParam => 1,
            ErrorCode::ResourceNotFound => 2,
            ErrorCode::ResourceExist => 3,
            ErrorCode::PermissionDenied => 4,
            ErrorCode::SystemError => 5,
            ErrorCode::DbError => 6,
            ErrorCode::AuthFailed => 7,
            ErrorCode::InvalidToken => 8,
            ErrorCode::TokenExpired => 9,
            ErrorCode::AccountLocked => 10,
            ErrorCode::AccountDisabled => 11,
            ErrorCode::Unknown(other) => other,
        }
    }
}

impl ErrorCode {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// `{code, message}` header present on every API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResponse {
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is locked")]
    AccountLocked,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("invalid login parameters: {0}")]
    InvalidParam(String),

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("no refresh token available")]
    MissingRefreshToken,

    #[error("a login is already in progress")]
    LoginInProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Validation error on `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Server rejected request ({code:?}): {message}")]
    Server { code: ErrorCode, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the error invalidates the current session rather than a
    /// single request.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Text suitable for the session's `error` field.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(AuthError::InvalidCredentials) => "Incorrect username or password".into(),
            Self::Auth(AuthError::AccountLocked) => {
                "This account is locked, contact an administrator".into()
            }
            Self::Auth(AuthError::AccountDisabled) => {
                "This account is disabled, contact an administrator".into()
            }
            Self::Auth(AuthError::LoginInProgress) => "Login is already in progress".into(),
            Self::Auth(AuthError::TokenExpired)
            | Self::Auth(AuthError::TokenInvalid(_))
            | Self::Auth(AuthError::MissingRefreshToken) => {
                "Your session has expired, please sign in again".into()
            }
            Self::Auth(AuthError::InvalidParam(msg)) if !msg.is_empty() => msg.clone(),
            Self::Auth(AuthError::InvalidParam(_)) => "Login failed".into(),
            Self::Network(_) => "Unable to reach the server, please try again".into(),
            Self::Server { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;
