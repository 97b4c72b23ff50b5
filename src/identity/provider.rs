use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::credentials::{CredentialPair, RefreshToken};
use super::principal::UserProfile;
use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, Transport};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const PROFILE_PATH: &str = "/auth/me";

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

/// Wire shape shared by `/auth/login` and `/auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
struct AuthResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    user: Option<UserProfile>,
}

impl AuthResponse {
    fn credentials(&self) -> ClientResult<CredentialPair> {
        Ok(CredentialPair::from_raw(&self.access_token, &self.refresh_token)?)
    }
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub credentials: CredentialPair,
    pub user: UserProfile,
}

/// Unauthenticated auth endpoints. These bypass the Authenticated Request Client:
/// a 401 here is an answer, not an expired session.
#[derive(Clone)]
pub struct AuthApi {
    transport: Arc<dyn Transport>,
}

impl AuthApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self { Self { transport } }

    pub async fn login(&self, req: &LoginRequest) -> ClientResult<LoginResponse> {
        let body = serde_json::to_value(req)?;
        let resp = self.transport.dispatch(ApiRequest::post(LOGIN_PATH, body)).await?;
        // 400/401/403 are the server refusing these credentials (bad password, disabled login)
        if matches!(resp.status, 400 | 401 | 403) {
            return Err(ClientError::InvalidCredentials { message: resp.error_message("Login failed") });
        }
        let resp = resp.into_result()?;
        let auth: AuthResponse = resp.json()?;
        let credentials = auth.credentials()?;
        let user = auth.user.ok_or_else(|| ClientError::decode("login response has no user"))?;
        debug!(target: "session", "login accepted user_id={} role={}", user.id, user.role);
        Ok(LoginResponse { credentials, user })
    }

    /// Exchange a refresh token for a new pair. Any failure means the refresh failed.
    pub async fn refresh(&self, token: &RefreshToken) -> ClientResult<CredentialPair> {
        let req = ApiRequest::post(REFRESH_PATH, json!({ "refreshToken": token.as_str() }));
        let resp = self.transport.dispatch(req).await?.into_result()?;
        let auth: AuthResponse = resp.json()?;
        auth.credentials()
    }
}
