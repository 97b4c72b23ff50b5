//!
//! Authenticated Request Client
//! ----------------------------
//! Every API call the application makes goes through `AuthenticatedClient::send`:
//! the current access token is attached as a bearer, and a 401 hands the request to
//! the Refresh Coordinator, which replays it once against the refreshed credential.
//! The replay path never re-enters the coordinator, so a request that is still
//! unauthorized after its one replay surfaces `SessionExpired` instead of looping.
//! Every other failure (other 4xx, 5xx, transport errors) is returned untouched.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::identity::{CredentialStore, RefreshCoordinator, Replay, ReplayFuture};
use crate::transport::{ApiRequest, ApiResponse, Transport};

#[derive(Clone)]
pub struct AuthenticatedClient {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl AuthenticatedClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<CredentialStore>, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { transport, store, coordinator }
    }

    pub async fn send(&self, req: ApiRequest) -> ClientResult<ApiResponse> {
        let used = self.store.access_token();
        let resp = self.transport.dispatch(req.clone().with_bearer(used.clone())).await?;
        if !resp.is_unauthorized() {
            return resp.into_result();
        }
        debug!(target: "transport", "401 on {} {}; deferring to refresh", req.method, req.path);
        let replay = self.replay(req);
        self.coordinator.request_refresh(used, replay).await
    }

    /// The one retry of `req`, bound to whatever credential is stored when it runs.
    fn replay(&self, req: ApiRequest) -> Replay {
        let transport = Arc::clone(&self.transport);
        let store = Arc::clone(&self.store);
        let coordinator = Arc::clone(&self.coordinator);
        Box::new(move || -> ReplayFuture {
            Box::pin(async move {
                let token = store.access_token();
                let path = req.path.clone();
                let resp = transport.dispatch(req.with_bearer(token.clone())).await?;
                if resp.is_unauthorized() {
                    warn!(target: "transport", "{} still unauthorized after refresh", path);
                    coordinator.invalidate(token.as_ref());
                    return Err(ClientError::SessionExpired);
                }
                resp.into_result()
            })
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, req: ApiRequest) -> ClientResult<T> {
        self.send(req).await?.json()
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        let req = ApiRequest::post(path, serde_json::to_value(body)?);
        self.send(req).await?.json()
    }

    pub async fn patch_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        let req = ApiRequest::patch(path, serde_json::to_value(body)?);
        self.send(req).await?.json()
    }
}
