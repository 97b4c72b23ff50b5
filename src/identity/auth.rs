use std::sync::Arc;

use tracing::info;

use super::authorizer::{permit, ADMIN_ROLES};
use super::credentials::CredentialStore;
use super::principal::{Role, UserProfile};
use super::provider::{AuthApi, LoginRequest, LoginResponse, PROFILE_PATH};
use super::session::{Session, SessionState};
use crate::client::AuthenticatedClient;
use crate::error::{ClientError, ClientResult};
use crate::transport::ApiRequest;

/// Inbound session operations: login, profile hydration, logout and role checks.
#[derive(Clone)]
pub struct AuthService {
    api: AuthApi,
    client: AuthenticatedClient,
    store: Arc<CredentialStore>,
    session: Arc<SessionState>,
}

impl AuthService {
    pub fn new(api: AuthApi, client: AuthenticatedClient, store: Arc<CredentialStore>, session: Arc<SessionState>) -> Self {
        Self { api, client, store, session }
    }

    /// On failure the session returns to `Anonymous` with `last_error` set and the
    /// Credential Store is left as it was. An attempt overtaken by a logout (and
    /// possibly a newer login) returns `Superseded` without touching either.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<UserProfile> {
        let attempt = self.session.begin_login()?;
        let generation = self.store.generation();
        let LoginResponse { credentials, user } = match self.api.login(&LoginRequest::new(email, password)).await {
            Ok(r) => r,
            Err(e) => {
                info!(target: "session", "login failed: {}", e.code_str());
                self.session.login_failed(attempt, e.clone());
                return Err(e);
            }
        };
        match self.store.replace_if_current(generation, credentials) {
            Ok(true) => {}
            Ok(false) => {
                info!(target: "session", "login superseded before its credentials were stored");
                self.session.login_failed(attempt, ClientError::Superseded);
                return Err(ClientError::Superseded);
            }
            Err(e) => {
                self.session.login_failed(attempt, e.clone());
                return Err(e);
            }
        }
        if !self.session.login_succeeded(attempt, user.clone()) {
            // a successful replace bumps the generation by exactly one
            self.store.clear_if_current(generation + 1);
            return Err(ClientError::Superseded);
        }
        info!(target: "session", "logged in user_id={} role={}", user.id, user.role);
        Ok(user)
    }

    /// Hydrate the user behind a durable credential via `GET /auth/me`.
    pub async fn fetch_profile(&self) -> ClientResult<UserProfile> {
        if self.store.is_empty() {
            self.session.profile_failed(ClientError::SessionExpired);
            return Err(ClientError::SessionExpired);
        }
        match self.client.get_json::<UserProfile>(ApiRequest::get(PROFILE_PATH)).await {
            Ok(user) => {
                if !self.session.profile_loaded(user.clone()) {
                    return Err(ClientError::Superseded);
                }
                Ok(user)
            }
            // the coordinator has already cleared credentials and moved the session to Expired
            Err(ClientError::SessionExpired) => Err(ClientError::SessionExpired),
            Err(e) => {
                let e = match e {
                    ClientError::Http { status, message } if message == format!("HTTP {}", status) => {
                        ClientError::http(status, "Failed to fetch profile")
                    }
                    other => other,
                };
                info!(target: "session", "profile fetch failed: {}", e);
                self.store.clear();
                self.session.profile_failed(e.clone());
                Err(e)
            }
        }
    }

    /// Always ends with no stored tokens, whatever is in flight.
    pub fn logout(&self) {
        self.store.clear();
        self.session.logout();
        info!(target: "session", "logged out");
    }

    pub fn session(&self) -> Session { self.session.snapshot() }
    pub fn state(&self) -> &Arc<SessionState> { &self.session }
    pub fn clear_error(&self) { self.session.clear_error() }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        self.session.user().map(|u| permit(u.role, roles)).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool { self.has_role(ADMIN_ROLES) }
}
