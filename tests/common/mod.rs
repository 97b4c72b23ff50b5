//! Shared fixtures for the integration tests: a scripted in-process transport that
//! records every dispatched request and can hold individual endpoints until released.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use serveline::context::ClientContext;
use serveline::error::{ClientError, ClientResult};
use serveline::identity::{CredentialPair, MemoryTokenStorage, TokenStorage, LOGIN_PATH, REFRESH_PATH};
use serveline::transport::{ApiRequest, ApiResponse, Transport};

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

/// Protected endpoints answer 401 unless the bearer equals `valid_token`.
/// `/auth/login` and `/auth/refresh` answer with their scripted replies regardless.
pub struct MockTransport {
    valid_token: Mutex<String>,
    login_reply: Mutex<ApiResponse>,
    refresh_reply: Mutex<ApiResponse>,
    replies: Mutex<HashMap<String, ApiResponse>>,
    failures: Mutex<HashMap<String, ClientError>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    log: Mutex<Vec<Recorded>>,
    refresh_hits: AtomicUsize,
}

impl MockTransport {
    pub fn new(valid_token: &str) -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new(valid_token.to_string()),
            login_reply: Mutex::new(ApiResponse::new(401, json!({"message": "Invalid credentials"}))),
            refresh_reply: Mutex::new(ApiResponse::new(401, json!({"message": "Invalid refresh token"}))),
            replies: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            refresh_hits: AtomicUsize::new(0),
        })
    }

    pub fn set_valid_token(&self, token: &str) { *self.valid_token.lock() = token.to_string(); }
    pub fn reply_login(&self, resp: ApiResponse) { *self.login_reply.lock() = resp; }
    pub fn reply_refresh(&self, resp: ApiResponse) { *self.refresh_reply.lock() = resp; }

    /// Reply for an authorized request to `path` (path plus query string).
    pub fn reply(&self, path: &str, resp: ApiResponse) { self.replies.lock().insert(path.to_string(), resp); }

    /// Requests to `path` fail before any response, like a dropped connection or a timeout.
    pub fn fail(&self, path: &str, err: ClientError) { self.failures.lock().insert(path.to_string(), err); }

    /// Requests to `path` block until `release(path)` is called.
    pub fn hold(&self, path: &str) { self.gates.lock().insert(path.to_string(), Arc::new(Semaphore::new(0))); }

    pub fn release(&self, path: &str) {
        if let Some(g) = self.gates.lock().get(path) { g.add_permits(1024); }
    }

    pub fn requests(&self) -> Vec<Recorded> { self.log.lock().clone() }
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }
    pub fn refresh_hits(&self) -> usize { self.refresh_hits.load(Ordering::SeqCst) }

    fn answer(&self, path: &str, bearer: Option<&str>) -> ClientResult<ApiResponse> {
        if let Some(err) = self.failures.lock().get(path) { return Err(err.clone()); }
        if path == LOGIN_PATH { return Ok(self.login_reply.lock().clone()); }
        if path == REFRESH_PATH { return Ok(self.refresh_reply.lock().clone()); }
        if bearer != Some(self.valid_token.lock().as_str()) {
            return Ok(ApiResponse::new(401, json!({"message": "Unauthorized"})));
        }
        Ok(self.replies.lock().get(path).cloned().unwrap_or_else(|| ApiResponse::new(200, json!({"path": path}))))
    }
}

impl Transport for MockTransport {
    fn dispatch(&self, req: ApiRequest) -> BoxFuture<'_, ClientResult<ApiResponse>> {
        let path = req.path_and_query();
        let bearer = req.bearer.as_ref().map(|t| t.as_str().to_string());
        self.log.lock().push(Recorded { method: req.method.to_string(), path: path.clone(), bearer: bearer.clone(), body: req.body.clone() });
        if path == REFRESH_PATH { self.refresh_hits.fetch_add(1, Ordering::SeqCst); }
        let gate = self.gates.lock().get(&path).cloned();
        Box::pin(async move {
            if let Some(g) = gate {
                let permit = g.acquire().await.expect("gate closed");
                permit.forget();
            }
            self.answer(&path, bearer.as_deref())
        })
    }
}

pub fn pair(access: &str, refresh: &str) -> CredentialPair {
    CredentialPair::from_raw(access, refresh).expect("valid test tokens")
}

pub fn context_with(mock: &Arc<MockTransport>, storage: impl TokenStorage + 'static) -> ClientContext {
    ClientContext::new(mock.clone(), storage)
}

/// Context resumed from a stored `access`/`refresh` pair.
pub fn resumed_context(mock: &Arc<MockTransport>, access: &str, refresh: &str) -> ClientContext {
    context_with(mock, MemoryTokenStorage::with_pair(pair(access, refresh)))
}

pub fn tokens_reply(access: &str, refresh: &str) -> ApiResponse {
    ApiResponse::new(200, json!({"access_token": access, "refresh_token": refresh}))
}

pub fn user_json(id: i64, role: &str) -> Value {
    json!({
        "id": id,
        "name": format!("User {}", id),
        "email": format!("user{}@bistro.test", id),
        "role": role,
        "phone": null,
        "restaurantId": 1,
        "isActive": true,
        "canLogin": true,
        "lastLogin": null,
        "createdAt": "2024-03-01T09:00:00.000Z",
        "updatedAt": "2024-03-01T09:00:00.000Z"
    })
}

pub fn login_reply(access: &str, refresh: &str, user: Value) -> ApiResponse {
    ApiResponse::new(200, json!({"access_token": access, "refresh_token": refresh, "user": user}))
}

/// Yield to the runtime until `cond` holds.
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..10_000 {
        if cond() { return; }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
