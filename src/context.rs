use std::sync::Arc;

use tracing::info;

use crate::client::AuthenticatedClient;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::identity::{
    AuthApi, AuthService, CredentialStore, FileTokenStorage, RefreshCoordinator, SessionState, TokenStorage,
};
use crate::staff::StaffService;
use crate::transport::{HttpTransport, Transport};

/// One Credential Store, one Session and one Refresh Coordinator, wired together.
/// Build once per process and hand out clones of the services.
#[derive(Clone)]
pub struct ClientContext {
    pub store: Arc<CredentialStore>,
    pub session: Arc<SessionState>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub client: AuthenticatedClient,
    pub auth: AuthService,
    pub staff: StaffService,
}

impl ClientContext {
    /// reqwest transport + file-backed tokens, as configured.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let transport = HttpTransport::new(config)?;
        info!(target: "startup", "api_url={} token_file={}", config.api_url, config.token_file.display());
        Ok(Self::new(Arc::new(transport), FileTokenStorage::new(config.token_file.clone())))
    }

    pub fn new(transport: Arc<dyn Transport>, storage: impl TokenStorage + 'static) -> Self {
        let store = Arc::new(CredentialStore::open(storage));
        let session = Arc::new(SessionState::new(!store.is_empty()));
        let api = AuthApi::new(Arc::clone(&transport));
        let coordinator = RefreshCoordinator::new(api.clone(), Arc::clone(&store), Arc::clone(&session));
        let client = AuthenticatedClient::new(transport, Arc::clone(&store), Arc::clone(&coordinator));
        let auth = AuthService::new(api, client.clone(), Arc::clone(&store), Arc::clone(&session));
        let staff = StaffService::new(client.clone());
        Self { store, session, coordinator, client, auth, staff }
    }
}
