//! Durable session storage and the derived user identity.
//!
//! Tokens live in `${AGORA_HOME}/session.json` with restricted permissions
//! (0600). The user identity is never fetched from the backend; it is decoded
//! from the access token's payload segment on demand.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Identity claims carried in the access token payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub member_id: i64,
    pub email: String,
    pub nickname: String,
}

/// On-disk session layout: two opaque bearer tokens.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct SessionFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl SessionFile {
    /// Loads the session file from disk.
    /// Returns an empty session if the file doesn't exist.
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session from {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", path.display()))
    }

    /// Saves the session file to disk with restricted permissions (0600).
    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize session")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .with_context(|| format!("Failed to open {} for writing", path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        Ok(())
    }
}

/// Decodes the identity claims from a JWT-shaped token's payload segment.
///
/// Returns None for anything that is not three dot-separated segments with a
/// base64url JSON payload carrying the expected claims.
pub fn decode_identity(token: &str) -> Option<UserIdentity> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&decoded).ok()
}

type AuthCallback = Box<dyn Fn() + Send + Sync>;
type ListenerList = Arc<Mutex<Vec<(u64, AuthCallback)>>>;

/// Handle returned by [`SessionStore::on_auth_change`].
///
/// Removes exactly the registered callback when consumed.
pub struct AuthSubscription {
    listeners: ListenerList,
    id: u64,
}

impl AuthSubscription {
    /// Unregisters the callback this subscription was created for.
    pub fn unsubscribe(self) {
        let mut listeners = self.listeners.lock().expect("listener lock poisoned");
        listeners.retain(|(id, _)| *id != self.id);
    }
}

/// Single source of truth for "am I logged in, and as whom".
///
/// All mutating operations write through to the session file, so a process
/// restart preserves the session. No network calls originate here.
pub struct SessionStore {
    path: PathBuf,
    user: Mutex<Option<UserIdentity>>,
    listeners: ListenerList,
    next_listener_id: AtomicU64,
}

impl SessionStore {
    /// Creates a store backed by the given session file path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            user: Mutex::new(None),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// Creates a store backed by `${AGORA_HOME}/session.json`.
    pub fn open_default() -> Self {
        Self::new(paths::session_path())
    }

    /// Persists both tokens, caches the identity decoded from the access
    /// token, then notifies subscribers.
    ///
    /// An undecodable access token is not an error: the raw token strings are
    /// still recorded and the cached identity becomes null.
    pub fn login(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        SessionFile {
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
        }
        .save(&self.path)?;

        let identity = decode_identity(access_token);
        if identity.is_none() {
            tracing::debug!("access token payload did not decode; identity unknown");
        }
        *self.user.lock().expect("user lock poisoned") = identity;

        self.notify();
        Ok(())
    }

    /// Clears both tokens and the cached identity, then notifies subscribers.
    pub fn logout(&self) -> Result<()> {
        SessionFile::default().save(&self.path)?;
        *self.user.lock().expect("user lock poisoned") = None;
        self.notify();
        Ok(())
    }

    /// Whether an access token is present in durable storage.
    ///
    /// A storage check only: the token is not decoded or validated.
    pub fn is_logged_in(&self) -> bool {
        self.read_file().access_token.is_some()
    }

    /// Returns the cached identity, decoding it from the stored access token
    /// on a cache miss.
    pub fn user(&self) -> Option<UserIdentity> {
        let mut cached = self.user.lock().expect("user lock poisoned");
        if cached.is_none() {
            if let Some(token) = self.read_file().access_token {
                *cached = decode_identity(&token);
            }
        }
        cached.clone()
    }

    /// Raw access token from durable storage.
    pub fn access_token(&self) -> Option<String> {
        self.read_file().access_token
    }

    /// Raw refresh token from durable storage.
    pub fn refresh_token(&self) -> Option<String> {
        self.read_file().refresh_token
    }

    /// Registers a callback invoked synchronously after every login/logout.
    ///
    /// No ordering guarantee among subscribers. Callbacks must not register
    /// or unregister subscriptions from within the notification.
    pub fn on_auth_change(&self, callback: impl Fn() + Send + Sync + 'static) -> AuthSubscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .push((id, Box::new(callback)));
        AuthSubscription {
            listeners: Arc::clone(&self.listeners),
            id,
        }
    }

    fn notify(&self) {
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        for (_, callback) in listeners.iter() {
            callback();
        }
    }

    fn read_file(&self) -> SessionFile {
        SessionFile::load(&self.path).unwrap_or_else(|err| {
            tracing::warn!("session file unreadable: {err:#}");
            SessionFile::default()
        })
    }
}
