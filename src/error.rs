//! Unified client error model.
//! Every fallible operation in the session core returns `ClientError`; the variants
//! map one-to-one onto what a presentation layer has to do next (show a message,
//! send the user back to login, retry later).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientError {
    /// Login rejected by the server; `message` is the server-provided text.
    #[error("{message}")]
    InvalidCredentials { message: String },
    /// Refresh failed or a replayed request was still unauthorized.
    #[error("session expired")]
    SessionExpired,
    #[error("a login is already in progress")]
    AlreadyInProgress,
    #[error("already authenticated; log out first")]
    AlreadyAuthenticated,
    /// The session changed (logout or new login) while the operation was in flight.
    #[error("session changed while the operation was in flight")]
    Superseded,
    #[error("network failure: {message}")]
    Network { message: String },
    /// Any non-401 HTTP failure, passed through untouched.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("token storage failure: {message}")]
    Storage { message: String },
    #[error("invalid response: {message}")]
    Decode { message: String },
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl ClientError {
    pub fn network<S: Into<String>>(msg: S) -> Self { ClientError::Network { message: msg.into() } }
    pub fn storage<S: Into<String>>(msg: S) -> Self { ClientError::Storage { message: msg.into() } }
    pub fn decode<S: Into<String>>(msg: S) -> Self { ClientError::Decode { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { ClientError::Config { message: msg.into() } }
    pub fn http<S: Into<String>>(status: u16, msg: S) -> Self { ClientError::Http { status, message: msg.into() } }

    /// Stable snake_case code, suitable for logs and machine-readable output.
    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::InvalidCredentials { .. } => "invalid_credentials",
            ClientError::SessionExpired => "session_expired",
            ClientError::AlreadyInProgress => "already_in_progress",
            ClientError::AlreadyAuthenticated => "already_authenticated",
            ClientError::Superseded => "superseded",
            ClientError::Network { .. } => "network_failure",
            ClientError::Http { .. } => "http_error",
            ClientError::Storage { .. } => "storage_error",
            ClientError::Decode { .. } => "decode_error",
            ClientError::Config { .. } => "config_error",
        }
    }

    /// True when the caller must stop and re-authenticate. Never retried.
    pub fn requires_reauth(&self) -> bool { matches!(self, ClientError::SessionExpired) }

    /// HTTP status carried by the error, if it came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::InvalidCredentials { .. } | ClientError::SessionExpired => Some(401),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self { ClientError::storage(err.to_string()) }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self { ClientError::decode(err.to_string()) }
}
