use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_CONFIG: &str = "SERVELINE_CONFIG";
pub const ENV_API_URL: &str = "SERVELINE_API_URL";
pub const ENV_TOKEN_FILE: &str = "SERVELINE_TOKEN_FILE";
pub const ENV_TIMEOUT_MS: &str = "SERVELINE_TIMEOUT_MS";

/// Client settings. Unspecified file values inherit the defaults; environment wins over both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the restaurant API, e.g. `http://localhost:3000`
    pub api_url: String,
    /// Where the access/refresh token pair is persisted between runs
    pub token_file: PathBuf,
    /// Transport timeout shared by every call, refresh included
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_file: default_token_file(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

fn default_token_file() -> PathBuf {
    let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).ok();
    let base = home.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    base.join(".serveline").join("tokens.json")
}

impl ClientConfig {
    /// Defaults, then the JSON file named by `SERVELINE_CONFIG` (if any), then env overrides.
    pub fn load() -> ClientResult<Self> {
        let base = match std::env::var(ENV_CONFIG) {
            Ok(p) if !p.trim().is_empty() => Self::from_file(Path::new(p.trim()))?,
            _ => Self::default(),
        };
        base.with_overrides(|k| std::env::var(k).ok())
    }

    pub fn from_file(path: &Path) -> ClientResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| ClientError::config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Apply overrides from a key lookup (the environment in production, a map in tests).
    pub fn with_overrides<F>(mut self, lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|s| !s.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(file) = lookup(ENV_TOKEN_FILE).filter(|s| !s.trim().is_empty()) {
            self.token_file = PathBuf::from(file.trim());
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS).filter(|s| !s.trim().is_empty()) {
            self.timeout_ms = ms.trim().parse::<u64>()
                .map_err(|_| ClientError::config(format!("{} must be a number of milliseconds, got '{}'", ENV_TIMEOUT_MS, ms)))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ClientResult<()> {
        let url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| ClientError::config(format!("invalid api_url '{}': {}", self.api_url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::config(format!("api_url must be http(s), got '{}'", url.scheme())));
        }
        if self.timeout_ms == 0 {
            return Err(ClientError::config("timeout_ms must be greater than zero"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}
