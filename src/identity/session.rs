//! Session State Machine.
//!
//! `Anonymous -> Authenticating -> Authenticated -> Expired`, driven by login,
//! profile fetch, refresh outcome and logout. One `SessionState` per process,
//! shared by handle (`Arc`) with whatever needs to read or transition it.
//! Transition methods return whether they applied; an outcome arriving for a
//! state the session has already left (e.g. after a logout) is ignored.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use super::principal::{Role, UserProfile};
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Anonymous,
    Authenticating,
    Authenticated,
    /// Same as `Anonymous` for routing; kept distinct so the UI can say why.
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub status: SessionStatus,
    /// Only ever populated while `Authenticated`.
    pub user: Option<UserProfile>,
    pub last_error: Option<ClientError>,
}

impl Session {
    fn with_status(status: SessionStatus) -> Self { Self { status, user: None, last_error: None } }

    pub fn is_authenticated(&self) -> bool { self.status == SessionStatus::Authenticated }
    pub fn role(&self) -> Option<Role> { self.user.as_ref().map(|u| u.role) }
    pub fn last_error_message(&self) -> Option<String> { self.last_error.as_ref().map(|e| e.to_string()) }
}

/// Ticket for one login call. Outcomes only apply while it is still the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginAttempt(u64);

pub struct SessionState {
    inner: RwLock<Session>,
    /// Current login attempt; only changed while `inner` is write-locked.
    attempt: AtomicU64,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionState {
    /// Optimistically `Authenticated` when a durable pair exists (pending a profile fetch).
    pub fn new(has_credentials: bool) -> Self {
        let status = if has_credentials { SessionStatus::Authenticated } else { SessionStatus::Anonymous };
        let (status_tx, _) = watch::channel(status);
        Self { inner: RwLock::new(Session::with_status(status)), attempt: AtomicU64::new(0), status_tx }
    }

    pub fn snapshot(&self) -> Session { self.inner.read().clone() }
    pub fn status(&self) -> SessionStatus { self.inner.read().status }
    pub fn user(&self) -> Option<UserProfile> { self.inner.read().user.clone() }

    /// Status stream for presentation layers.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> { self.status_tx.subscribe() }

    fn publish(&self, from: SessionStatus, to: SessionStatus) {
        if from != to {
            info!(target: "session", "session {:?} -> {:?}", from, to);
        }
        self.status_tx.send_replace(to);
    }

    /// `Anonymous|Expired -> Authenticating`.
    pub fn begin_login(&self) -> ClientResult<LoginAttempt> {
        let (from, attempt) = {
            let mut s = self.inner.write();
            match s.status {
                SessionStatus::Authenticating => return Err(ClientError::AlreadyInProgress),
                SessionStatus::Authenticated => return Err(ClientError::AlreadyAuthenticated),
                SessionStatus::Anonymous | SessionStatus::Expired => {}
            }
            let from = s.status;
            *s = Session::with_status(SessionStatus::Authenticating);
            (from, self.attempt.fetch_add(1, Ordering::SeqCst) + 1)
        };
        self.publish(from, SessionStatus::Authenticating);
        Ok(LoginAttempt(attempt))
    }

    fn is_current(&self, s: &Session, attempt: LoginAttempt) -> bool {
        s.status == SessionStatus::Authenticating && self.attempt.load(Ordering::SeqCst) == attempt.0
    }

    pub fn login_succeeded(&self, attempt: LoginAttempt, user: UserProfile) -> bool {
        {
            let mut s = self.inner.write();
            if !self.is_current(&s, attempt) { return false; }
            *s = Session { status: SessionStatus::Authenticated, user: Some(user), last_error: None };
        }
        self.publish(SessionStatus::Authenticating, SessionStatus::Authenticated);
        true
    }

    /// A superseded attempt leaves the session alone.
    pub fn login_failed(&self, attempt: LoginAttempt, error: ClientError) -> bool {
        {
            let mut s = self.inner.write();
            if !self.is_current(&s, attempt) { return false; }
            *s = Session { status: SessionStatus::Anonymous, user: None, last_error: Some(error) };
        }
        self.publish(SessionStatus::Authenticating, SessionStatus::Anonymous);
        true
    }

    /// Hydrate the user of an (optimistically) authenticated session.
    pub fn profile_loaded(&self, user: UserProfile) -> bool {
        let mut s = self.inner.write();
        if s.status != SessionStatus::Authenticated { return false; }
        s.user = Some(user);
        s.last_error = None;
        debug!(target: "session", "profile loaded");
        true
    }

    pub fn profile_failed(&self, error: ClientError) -> bool {
        {
            let mut s = self.inner.write();
            if s.status != SessionStatus::Authenticated { return false; }
            *s = Session { status: SessionStatus::Anonymous, user: None, last_error: Some(error) };
        }
        self.publish(SessionStatus::Authenticated, SessionStatus::Anonymous);
        true
    }

    /// Refresh failure signal. Only an authenticated session can expire.
    pub fn expire(&self) -> bool {
        {
            let mut s = self.inner.write();
            if s.status != SessionStatus::Authenticated { return false; }
            *s = Session { status: SessionStatus::Expired, user: None, last_error: Some(ClientError::SessionExpired) };
        }
        self.publish(SessionStatus::Authenticated, SessionStatus::Expired);
        true
    }

    /// Any state -> `Anonymous`. Never fails.
    pub fn logout(&self) {
        let from = {
            let mut s = self.inner.write();
            let from = s.status;
            *s = Session::with_status(SessionStatus::Anonymous);
            self.attempt.fetch_add(1, Ordering::SeqCst);
            from
        };
        self.publish(from, SessionStatus::Anonymous);
    }

    pub fn clear_error(&self) { self.inner.write().last_error = None; }
}
