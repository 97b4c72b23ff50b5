//! Credential pair, durable token storage, and the in-process Credential Store.
//!
//! The store is the single source of truth for the current access/refresh pair.
//! Readers always observe a complete pair (or none): the pair is swapped as one
//! value under a write lock, after the durable copy has been written.
//!
//! Every `set`/`clear` bumps a generation counter. Operations that outlive a
//! user action (a refresh, a login) capture the generation up front and commit
//! with `replace_if_current`/`clear_if_current`, so an outcome that settles after
//! a logout is discarded instead of resurrecting the session.

use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

/// Errors from token validation. Tokens end up in `Authorization` headers, so they
/// must be non-empty visible ASCII.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token cannot be empty")]
    Empty,
    #[error("token contains invalid character U+{:04X} at position {position}", *character as u32)]
    InvalidCharacter { character: char, position: usize },
}

fn validate_token(token: &str) -> Result<(), TokenError> {
    if token.is_empty() {
        return Err(TokenError::Empty);
    }
    for (idx, ch) in token.chars().enumerate() {
        if !(32..=126).contains(&(ch as u32)) {
            return Err(TokenError::InvalidCharacter { character: ch, position: idx });
        }
    }
    Ok(())
}

macro_rules! opaque_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&"[REDACTED]").finish()
            }
        }

        impl TryFrom<String> for $name {
            type Error = TokenError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                validate_token(&value)?;
                Ok(Self(value))
            }
        }

        impl TryFrom<&str> for $name {
            type Error = TokenError;
            fn try_from(value: &str) -> Result<Self, Self::Error> { Self::try_from(value.to_string()) }
        }
    };
}

opaque_token!(
    /// Short-lived bearer credential attached to every API call.
    AccessToken
);
opaque_token!(
    /// Longer-lived credential used only against `/auth/refresh`.
    RefreshToken
);

/// Access and refresh token, always replaced together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    access: AccessToken,
    refresh: RefreshToken,
}

impl CredentialPair {
    pub fn new(access: AccessToken, refresh: RefreshToken) -> Self { Self { access, refresh } }

    /// Build from raw wire strings, rejecting values that cannot be sent as headers.
    pub fn from_raw(access: &str, refresh: &str) -> Result<Self, TokenError> {
        Ok(Self { access: AccessToken::try_from(access)?, refresh: RefreshToken::try_from(refresh)? })
    }

    pub fn access_token(&self) -> &AccessToken { &self.access }
    pub fn refresh_token(&self) -> &RefreshToken { &self.refresh }
}

/// On-disk shape. Either key missing means anonymous.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Durable backing for the Credential Store.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> ClientResult<Option<CredentialPair>>;
    fn save(&self, pair: &CredentialPair) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// JSON file holding exactly the two token strings. Writes go through a temp file + rename.
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> ClientResult<Option<CredentialPair>> {
        if !self.path.exists() { return Ok(None); }
        let text = std::fs::read_to_string(&self.path)?;
        let stored: StoredTokens = match serde_json::from_str(&text) {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "credentials", "ignoring unreadable token file {}: {}", self.path.display(), e);
                return Ok(None);
            }
        };
        let (Some(access), Some(refresh)) = (stored.access_token, stored.refresh_token) else { return Ok(None); };
        match CredentialPair::from_raw(&access, &refresh) {
            Ok(pair) => Ok(Some(pair)),
            Err(e) => {
                warn!(target: "credentials", "ignoring invalid token in {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, pair: &CredentialPair) -> ClientResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir)?; }
        }
        let stored = StoredTokens {
            access_token: Some(pair.access_token().as_str().to_string()),
            refresh_token: Some(pair.refresh_token().as_str().to_string()),
        };
        let tmp = self.tmp_path();
        std::fs::write(&tmp, serde_json::to_vec_pretty(&stored)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Non-durable storage: tests, and embedding hosts that persist elsewhere.
#[derive(Default)]
pub struct MemoryTokenStorage {
    inner: Mutex<Option<CredentialPair>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self { Self::default() }
    pub fn with_pair(pair: CredentialPair) -> Self { Self { inner: Mutex::new(Some(pair)) } }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> ClientResult<Option<CredentialPair>> { Ok(self.inner.lock().clone()) }
    fn save(&self, pair: &CredentialPair) -> ClientResult<()> { *self.inner.lock() = Some(pair.clone()); Ok(()) }
    fn clear(&self) -> ClientResult<()> { *self.inner.lock() = None; Ok(()) }
}

#[derive(Debug)]
struct Slot {
    pair: Option<CredentialPair>,
    generation: u64,
}

pub struct CredentialStore {
    slot: RwLock<Slot>,
    storage: Box<dyn TokenStorage>,
}

impl CredentialStore {
    /// Load the durable pair once; later reads are served from memory.
    pub fn open(storage: impl TokenStorage + 'static) -> Self {
        let pair = match storage.load() {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "credentials", "token storage unreadable, starting anonymous: {}", e);
                None
            }
        };
        debug!(target: "credentials", "credential store opened has_pair={}", pair.is_some());
        Self { slot: RwLock::new(Slot { pair, generation: 0 }), storage: Box::new(storage) }
    }

    pub fn get(&self) -> Option<CredentialPair> { self.slot.read().pair.clone() }

    pub fn access_token(&self) -> Option<AccessToken> { self.slot.read().pair.as_ref().map(|p| p.access.clone()) }

    pub fn is_empty(&self) -> bool { self.slot.read().pair.is_none() }

    pub fn generation(&self) -> u64 { self.slot.read().generation }

    /// Current pair together with the generation it belongs to.
    pub fn snapshot(&self) -> (Option<CredentialPair>, u64) {
        let s = self.slot.read();
        (s.pair.clone(), s.generation)
    }

    /// Persist then publish `pair`. On a storage error nothing changes.
    pub fn set(&self, pair: CredentialPair) -> ClientResult<u64> {
        let mut slot = self.slot.write();
        self.storage.save(&pair)?;
        slot.pair = Some(pair);
        slot.generation += 1;
        debug!(target: "credentials", "credentials replaced generation={}", slot.generation);
        Ok(slot.generation)
    }

    /// `set`, but only while the store is still at `generation`. Returns false when superseded.
    pub fn replace_if_current(&self, generation: u64, pair: CredentialPair) -> ClientResult<bool> {
        let mut slot = self.slot.write();
        if slot.generation != generation {
            debug!(target: "credentials", "discarding stale credentials expected={} current={}", generation, slot.generation);
            return Ok(false);
        }
        self.storage.save(&pair)?;
        slot.pair = Some(pair);
        slot.generation += 1;
        debug!(target: "credentials", "credentials rotated generation={}", slot.generation);
        Ok(true)
    }

    /// Drop both tokens. Never fails: a durable-clear error is logged and memory is cleared anyway.
    pub fn clear(&self) {
        let mut slot = self.slot.write();
        if let Err(e) = self.storage.clear() {
            warn!(target: "credentials", "failed to clear durable tokens: {}", e);
        }
        slot.pair = None;
        slot.generation += 1;
        debug!(target: "credentials", "credentials cleared generation={}", slot.generation);
    }

    /// `clear`, but only while the store is still at `generation`.
    pub fn clear_if_current(&self, generation: u64) -> bool {
        let mut slot = self.slot.write();
        if slot.generation != generation { return false; }
        if let Err(e) = self.storage.clear() {
            warn!(target: "credentials", "failed to clear durable tokens: {}", e);
        }
        slot.pair = None;
        slot.generation += 1;
        true
    }
}

impl From<TokenError> for ClientError {
    fn from(err: TokenError) -> Self { ClientError::decode(format!("invalid token: {}", err)) }
}
