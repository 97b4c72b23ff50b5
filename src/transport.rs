//!
//! Transport layer
//! ---------------
//! Plain request/response values plus the `Transport` seam every network call goes
//! through. `HttpTransport` is the reqwest-backed implementation used by the binary;
//! tests plug in scripted transports.
//!
//! The transport knows nothing about sessions: it attaches the bearer it is given and
//! reports the status it gets back. Refresh-on-401 lives in `client`.

use futures_util::future::BoxFuture;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::identity::AccessToken;

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, always starting with '/'
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<AccessToken>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') { path.insert(0, '/'); }
        Self { method, path, query: Vec::new(), body: None, bearer: None }
    }
    pub fn get(path: impl Into<String>) -> Self { Self::new(Method::GET, path) }
    pub fn post(path: impl Into<String>, body: Value) -> Self { Self::new(Method::POST, path).with_body(body) }
    pub fn patch(path: impl Into<String>, body: Value) -> Self { Self::new(Method::PATCH, path).with_body(body) }

    pub fn with_body(mut self, body: Value) -> Self { self.body = Some(body); self }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Replace (or drop) the bearer credential. Used when replaying after a refresh.
    pub fn with_bearer(mut self, token: Option<AccessToken>) -> Self { self.bearer = token; self }

    /// `/path?k=v&...` with percent-encoded query values.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() { return self.path.clone(); }
        let qs = self.query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, qs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self { Self { status, body } }
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
    pub fn is_unauthorized(&self) -> bool { self.status == 401 }

    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_value(self.body.clone()).map_err(ClientError::from)
    }

    /// Server-provided message (`message` as string, or array of strings), else `default`.
    pub fn error_message(&self, default: &str) -> String {
        match self.body.get("message") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                if parts.is_empty() { default.to_string() } else { parts.join(", ") }
            }
            _ => match &self.body {
                Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => default.to_string(),
            },
        }
    }

    /// Pass 2xx through; map anything else to `ClientError::Http` untouched.
    pub fn into_result(self) -> ClientResult<ApiResponse> {
        if self.is_success() { return Ok(self); }
        let default = format!("HTTP {}", self.status);
        Err(ClientError::http(self.status, self.error_message(&default)))
    }
}

/// Network seam. Implementations must not interpret 401s; they return them as responses.
pub trait Transport: Send + Sync {
    fn dispatch(&self, req: ApiRequest) -> BoxFuture<'_, ClientResult<ApiResponse>>;
}

/// `Authorization: Bearer <token>` value, marked sensitive so it is redacted in debug output.
pub fn bearer_header(token: &AccessToken) -> ClientResult<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
        .map_err(|e| ClientError::decode(format!("access token is not a valid header value: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

#[derive(Clone)]
pub struct HttpTransport {
    base: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base = Url::parse(&config.api_url)
            .map_err(|e| ClientError::config(format!("invalid api_url '{}': {}", config.api_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url { &self.base }

    fn url_for(&self, req: &ApiRequest) -> ClientResult<Url> {
        // Keep any path prefix on the base (e.g. http://host/api)
        let joined = format!("{}{}", self.base.as_str().trim_end_matches('/'), req.path_and_query());
        Url::parse(&joined).map_err(|e| ClientError::config(format!("invalid request url '{}': {}", joined, e)))
    }

    async fn execute(&self, req: ApiRequest) -> ClientResult<ApiResponse> {
        let url = self.url_for(&req)?;
        let mut builder = self.client.request(req.method.clone(), url);
        if let Some(token) = &req.bearer {
            builder = builder.header(AUTHORIZATION, bearer_header(token)?);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(map_reqwest_error)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        debug!(target: "transport", "{} {} -> {}", req.method, req.path, status);
        Ok(ApiResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn dispatch(&self, req: ApiRequest) -> BoxFuture<'_, ClientResult<ApiResponse>> {
        Box::pin(self.execute(req))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::network(format!("request timed out: {}", err))
    } else {
        ClientError::network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_values_are_percent_encoded() {
        let req = ApiRequest::get("auth/staff").with_query("role", "WAITER").with_query("q", "a b&c");
        assert_eq!(req.path_and_query(), "/auth/staff?role=WAITER&q=a%20b%26c");
    }

    #[test]
    fn error_message_prefers_server_text() {
        let r = ApiResponse::new(401, json!({"message": "Invalid credentials", "statusCode": 401}));
        assert_eq!(r.error_message("Login failed"), "Invalid credentials");
        let r = ApiResponse::new(400, json!({"message": ["email must be an email", "password too short"]}));
        assert_eq!(r.error_message("x"), "email must be an email, password too short");
        let r = ApiResponse::new(500, Value::Null);
        assert_eq!(r.error_message("Login failed"), "Login failed");
    }

    #[test]
    fn non_success_maps_to_http_error_untouched() {
        let err = ApiResponse::new(403, json!({"message": "Forbidden resource"})).into_result().unwrap_err();
        assert_eq!(err, ClientError::http(403, "Forbidden resource"));
        assert!(ApiResponse::new(204, Value::Null).into_result().is_ok());
    }

    #[test]
    fn bearer_header_is_sensitive() {
        let token = AccessToken::try_from("abc.def").unwrap();
        let h = bearer_header(&token).unwrap();
        assert_eq!(h.to_str().unwrap(), "Bearer abc.def");
        assert!(h.is_sensitive());
    }

    #[test]
    fn url_keeps_base_prefix() {
        let cfg = ClientConfig { api_url: "http://localhost:3000/api/".into(), ..ClientConfig::default() };
        let t = HttpTransport::new(&cfg).unwrap();
        assert_eq!(t.base().path(), "/api/");
        let url = t.url_for(&ApiRequest::get("/auth/me")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/auth/me");
    }
}
