//! Refresh Coordinator: single-flight token refresh with a FIFO replay queue.
//!
//! Any number of requests may come back 401 while sharing one expired access
//! token. The first one to report in becomes the leader: it marks a refresh in
//! flight and spawns the one `/auth/refresh` call. Everyone else, including
//! requests that report in while that call is outstanding, joins the `waiters`
//! queue. When the refresh settles the queue is taken in one critical section
//! (clearing `in_flight` at the same time, so no waiter can slip between the two)
//! and either replayed in join order against the stored credential, or rejected
//! with `SessionExpired` as a whole.
//!
//! The settle step runs in its own task: waiters always settle even if the request
//! that triggered the refresh is dropped, and a logout does not abort the call. A
//! logout does bump the Credential Store generation, so the late outcome is
//! discarded rather than stored.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::credentials::{AccessToken, CredentialStore, RefreshToken};
use super::provider::AuthApi;
use super::session::SessionState;
use crate::error::{ClientError, ClientResult};
use crate::transport::ApiResponse;

pub type ReplayFuture = BoxFuture<'static, ClientResult<ApiResponse>>;

/// Re-dispatch of a failed call. Reads the Credential Store when invoked; owns no credential.
pub type Replay = Box<dyn FnOnce() -> ReplayFuture + Send>;

struct PendingRequest {
    replay: Replay,
    resolve: oneshot::Sender<ClientResult<ApiResponse>>,
}

#[derive(Default)]
struct CoordinatorState {
    in_flight: bool,
    waiters: VecDeque<PendingRequest>,
}

enum Admission {
    Queued,
    Lead { refresh: RefreshToken, generation: u64 },
    /// The credential was rotated after this request was sent; replay right away.
    AlreadyRotated(Replay),
    NoRefreshToken { generation: u64 },
}

pub struct RefreshCoordinator {
    api: AuthApi,
    store: Arc<CredentialStore>,
    session: Arc<SessionState>,
    state: Mutex<CoordinatorState>,
    refresh_calls: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(api: AuthApi, store: Arc<CredentialStore>, session: Arc<SessionState>) -> Arc<Self> {
        Arc::new(Self { api, store, session, state: Mutex::new(CoordinatorState::default()), refresh_calls: AtomicU64::new(0) })
    }

    pub fn is_refreshing(&self) -> bool { self.state.lock().in_flight }

    /// Requests waiting on the in-flight refresh (the leader's own request included).
    pub fn queued(&self) -> usize { self.state.lock().waiters.len() }

    /// Refresh network calls issued over the coordinator's lifetime.
    pub fn refresh_calls(&self) -> u64 { self.refresh_calls.load(Ordering::SeqCst) }

    /// Called for a request that got a 401 while carrying `used` as its bearer.
    /// Resolves with the outcome of `replay` once a refresh has succeeded, or
    /// `SessionExpired` when it failed or cannot happen.
    pub async fn request_refresh(self: &Arc<Self>, used: Option<AccessToken>, replay: Replay) -> ClientResult<ApiResponse> {
        let (tx, rx) = oneshot::channel();
        let admission = {
            let mut st = self.state.lock();
            if st.in_flight {
                st.waiters.push_back(PendingRequest { replay, resolve: tx });
                Admission::Queued
            } else {
                let (pair, generation) = self.store.snapshot();
                match pair {
                    Some(p) if used.as_ref() != Some(p.access_token()) => Admission::AlreadyRotated(replay),
                    Some(p) => {
                        st.in_flight = true;
                        st.waiters.push_back(PendingRequest { replay, resolve: tx });
                        Admission::Lead { refresh: p.refresh_token().clone(), generation }
                    }
                    None => Admission::NoRefreshToken { generation },
                }
            }
        };

        match admission {
            Admission::Queued => debug!(target: "refresh", "refresh in flight; request queued"),
            Admission::Lead { refresh, generation } => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.settle(refresh, generation).await });
            }
            Admission::AlreadyRotated(replay) => {
                debug!(target: "refresh", "credential already rotated; replaying without refresh");
                return replay().await;
            }
            Admission::NoRefreshToken { generation } => {
                warn!(target: "refresh", "401 with no refresh token available; session expired");
                self.expire(generation);
                return Err(ClientError::SessionExpired);
            }
        }

        rx.await.unwrap_or(Err(ClientError::SessionExpired))
    }

    async fn settle(self: Arc<Self>, refresh: RefreshToken, generation: u64) {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        info!(target: "refresh", "refreshing access token");

        let outcome = match self.api.refresh(&refresh).await {
            Ok(pair) => match self.store.replace_if_current(generation, pair) {
                Ok(true) => Ok(()),
                Ok(false) => {
                    info!(target: "refresh", "session changed during refresh; discarding new credentials");
                    Err(ClientError::SessionExpired)
                }
                Err(e) => {
                    warn!(target: "refresh", "could not persist refreshed credentials: {}", e);
                    self.expire(generation);
                    Err(ClientError::SessionExpired)
                }
            },
            Err(e) => {
                warn!(target: "refresh", "refresh rejected: {}", e);
                self.expire(generation);
                Err(ClientError::SessionExpired)
            }
        };

        let waiters = {
            let mut st = self.state.lock();
            st.in_flight = false;
            std::mem::take(&mut st.waiters)
        };

        match outcome {
            Ok(()) => {
                debug!(target: "refresh", "refresh succeeded; replaying {} request(s)", waiters.len());
                // join_all polls in order, so replays are dispatched in join order
                join_all(waiters.into_iter().map(|w| async move {
                    let result = (w.replay)().await;
                    let _ = w.resolve.send(result);
                }))
                .await;
            }
            Err(e) => {
                debug!(target: "refresh", "rejecting {} queued request(s)", waiters.len());
                for w in waiters {
                    let _ = w.resolve.send(Err(e.clone()));
                }
            }
        }
    }

    /// A replayed request was still unauthorized. Expire the session if `used` is
    /// still the stored credential; a newer credential means someone already moved on.
    pub fn invalidate(&self, used: Option<&AccessToken>) {
        let (pair, generation) = self.store.snapshot();
        if pair.as_ref().map(|p| p.access_token()) == used {
            self.expire(generation);
        }
    }

    fn expire(&self, generation: u64) {
        if self.store.clear_if_current(generation) {
            self.session.expire();
        }
    }
}
