//! Session and identity core: credentials, single-flight refresh, session state and
//! role checks. Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod credentials;
mod session;
mod provider;
mod refresh;
mod auth;
mod authorizer;

pub use principal::{Role, UserProfile};
pub use credentials::{
    AccessToken, CredentialPair, CredentialStore, FileTokenStorage, MemoryTokenStorage, RefreshToken, TokenError,
    TokenStorage,
};
pub use session::{LoginAttempt, Session, SessionState, SessionStatus};
pub use provider::{AuthApi, LoginRequest, LoginResponse, LOGIN_PATH, PROFILE_PATH, REFRESH_PATH};
pub use refresh::{RefreshCoordinator, Replay, ReplayFuture};
pub use auth::AuthService;
pub use authorizer::{
    guard_route, permit, route_permission, route_table, routes_for, RouteDecision, RoutePermission, ADMIN_ROLES,
    ALL_ROLES, FLOOR_ROLES, HOME_ROUTE, KITCHEN_ROLES, LOGIN_ROUTE, MANAGEMENT_ROLES,
};
