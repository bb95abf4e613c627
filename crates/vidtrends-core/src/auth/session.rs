//! Session state for the logged-in user.
//!
//! `SessionStore` is the single source of truth for who is logged in and
//! with what access token. It refreshes expired tokens against the
//! backend, coalescing concurrent refresh attempts into one network call,
//! and publishes session transitions on a watch channel so a front-end
//! can route the user back to login when the session ends.
//!
//! Sessions are optionally persisted to disk and restored on startup if
//! still within the token lifetime.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::api::transport::{OutboundRequest, Transport, TransportError};
use crate::models::User;

use super::credentials::CredentialStore;

/// Session file name in the cache directory
const SESSION_FILE: &str = "session.json";

/// Access token lifetime in minutes.
/// The backend issues 60-minute access tokens.
const TOKEN_EXPIRY_MINUTES: i64 = 60;

/// Buffer before expiry at which a session counts as needing refresh
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Token refresh endpoint
const REFRESH_PATH: &str = "/api/auth/refresh";

/// Logout notification endpoint
const LOGOUT_PATH: &str = "/api/auth/logout";

/// A fully authenticated session: the token is present exactly when the
/// user is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user: User,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        Utc::now() > expiry
    }

    /// Check if the token will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at = self.created_at
            + Duration::minutes(TOKEN_EXPIRY_MINUTES - TOKEN_REFRESH_BUFFER_MINUTES);
        Utc::now() > refresh_at
    }

    /// Minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        (expiry - Utc::now()).num_minutes().max(0)
    }
}

/// Where the session stands, for consumers that drive navigation.
/// `Expired` is the signal to route the user back to the login view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    Expired,
}

/// Errors from the token refresh exchange. Any of these ends the session.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no refresh credential available")]
    NoCredential,

    #[error("refresh rejected with status {0}")]
    Rejected(u16),

    #[error("refresh transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// What the refresh endpoint answers with. A rotated refresh credential
/// replaces the stored one when present.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Single source of truth for who is logged in and with what credential.
///
/// Shared behind an `Arc`. Token reads are synchronous and always see the
/// latest committed value; writes happen only in `set_user`/`establish`,
/// `refresh_access_token`, and `logout`. Concurrent refresh attempts are
/// coalesced: one network exchange at a time, and callers that lost the
/// race adopt its committed outcome.
pub struct SessionStore {
    transport: Arc<dyn Transport>,
    inner: RwLock<Option<SessionData>>,
    refresh_token: RwLock<Option<String>>,
    /// Bumped on every committed session write; lets a refresh caller
    /// detect that the token it saw rejected is already stale.
    generation: AtomicU64,
    refresh_lock: Mutex<()>,
    state_tx: watch::Sender<SessionState>,
    cache_dir: Option<PathBuf>,
    use_keychain: bool,
}

impl SessionStore {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Anonymous);
        Self {
            transport,
            inner: RwLock::new(None),
            refresh_token: RwLock::new(None),
            generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
            state_tx,
            cache_dir: None,
            use_keychain: false,
        }
    }

    /// Persist the session under this directory and restore it on `load`.
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = Some(cache_dir);
        self
    }

    /// Keep the refresh credential in the OS keychain across runs.
    pub fn with_keychain(mut self) -> Self {
        self.use_keychain = true;
        self
    }

    /// Watch session transitions. Consumers redirect to their login entry
    /// point when the value becomes `Expired`.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// The current access token, if a session exists. Never blocks.
    pub fn current_token(&self) -> Option<String> {
        self.read_session().as_ref().map(|s| s.access_token.clone())
    }

    /// The logged-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.read_session().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_session().is_some()
    }

    /// Replace the session atomically with a freshly authenticated user.
    pub fn set_user(&self, user: User, access_token: String) {
        let data = SessionData {
            user,
            access_token,
            created_at: Utc::now(),
        };
        *self.write_session() = Some(data);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.set_state(SessionState::Authenticated);
        self.persist();
    }

    /// Establish a session from a login response: the user, the access
    /// token, and the refresh credential backing future refreshes.
    pub fn establish(&self, user: User, access_token: String, refresh_token: String) {
        if self.use_keychain {
            if let Err(err) = CredentialStore::store(&user.email, &refresh_token) {
                warn!(error = %err, "failed to store refresh credential in keychain");
            }
        }
        *self.write_refresh_token() = Some(refresh_token);
        self.set_user(user, access_token);
    }

    /// Exchange the refresh credential for a new access token.
    ///
    /// Callers that arrive while another refresh is in flight wait for it
    /// and share its outcome instead of issuing their own exchange. Any
    /// failure tears the session down.
    pub async fn refresh_access_token(&self) -> Result<String, RefreshError> {
        let observed = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;

        // The session was rewritten while we waited for the lock: another
        // caller finished a refresh (or the session was torn down). Adopt
        // that outcome.
        if self.generation.load(Ordering::Acquire) != observed {
            return match self.current_token() {
                Some(token) => Ok(token),
                None => Err(RefreshError::NoCredential),
            };
        }

        let refresh_token = match self.current_refresh_token() {
            Some(token) => token,
            None => {
                debug!("no refresh credential, ending session");
                self.expire();
                return Err(RefreshError::NoCredential);
            }
        };

        debug!("refreshing access token");
        let mut request = OutboundRequest::new(Method::POST, REFRESH_PATH);
        request.body = Some(json!({ "refresh_token": refresh_token }));

        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "refresh request failed");
                self.expire();
                return Err(err.into());
            }
        };

        if !response.status.is_success() {
            warn!(status = %response.status, "refresh rejected by backend");
            self.expire();
            return Err(RefreshError::Rejected(response.status.as_u16()));
        }

        let body: RefreshResponse = match serde_json::from_str(&response.body) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "could not parse refresh response");
                self.expire();
                return Err(RefreshError::Rejected(response.status.as_u16()));
            }
        };

        // Commit the new token against the existing user.
        let email = {
            let mut guard = self.write_session();
            match guard.as_mut() {
                Some(data) => {
                    data.access_token = body.access_token.clone();
                    data.created_at = Utc::now();
                    Some(data.user.email.clone())
                }
                None => None,
            }
        };
        let Some(email) = email else {
            // Session was torn down while the exchange was in flight.
            self.expire();
            return Err(RefreshError::NoCredential);
        };

        if let Some(rotated) = body.refresh_token {
            if self.use_keychain {
                if let Err(err) = CredentialStore::store(&email, &rotated) {
                    warn!(error = %err, "failed to store rotated refresh credential");
                }
            }
            *self.write_refresh_token() = Some(rotated);
        }

        self.generation.fetch_add(1, Ordering::AcqRel);
        self.set_state(SessionState::Authenticated);
        self.persist();
        debug!("access token refreshed");
        Ok(body.access_token)
    }

    /// Clear the session. Always succeeds locally; the backend
    /// notification is best-effort. Logging out while already logged out
    /// is a no-op.
    pub async fn logout(&self) {
        let data = { self.write_session().take() };
        let Some(data) = data else {
            debug!("logout with no active session");
            return;
        };

        *self.write_refresh_token() = None;
        self.generation.fetch_add(1, Ordering::AcqRel);

        if self.use_keychain {
            if let Err(err) = CredentialStore::delete(&data.user.email) {
                debug!(error = %err, "no keychain credential to remove");
            }
        }
        self.remove_persisted();
        self.set_state(SessionState::Anonymous);

        // Tell the backend the token is done with. Local logout already
        // happened, so failures are only logged.
        let mut request = OutboundRequest::new(Method::POST, LOGOUT_PATH);
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", data.access_token)) {
            request.headers.insert(AUTHORIZATION, value);
        }
        match self.transport.execute(request).await {
            Ok(response) if !response.status.is_success() => {
                warn!(status = %response.status, "logout notification rejected");
            }
            Ok(_) => debug!("logged out"),
            Err(err) => warn!(error = %err, "logout notification failed"),
        }
    }

    /// Restore a persisted session from disk, if present and not expired.
    pub fn load(&self) -> Result<bool> {
        let Some(path) = self.session_path() else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }

        let contents =
            std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        if data.is_expired() {
            return Ok(false);
        }

        if self.use_keychain {
            if let Ok(token) = CredentialStore::get(&data.user.email) {
                *self.write_refresh_token() = Some(token);
            }
        }

        *self.write_session() = Some(data);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.set_state(SessionState::Authenticated);
        Ok(true)
    }

    /// Tear the session down after an unrecoverable refresh failure.
    fn expire(&self) {
        let email = { self.write_session().take().map(|data| data.user.email) };
        *self.write_refresh_token() = None;
        self.generation.fetch_add(1, Ordering::AcqRel);

        if self.use_keychain {
            if let Some(ref email) = email {
                if let Err(err) = CredentialStore::delete(email) {
                    debug!(error = %err, "no keychain credential to remove");
                }
            }
        }
        self.remove_persisted();
        self.set_state(SessionState::Expired);
    }

    fn current_refresh_token(&self) -> Option<String> {
        self.refresh_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    // The session is only ever replaced wholesale, so a guard recovered
    // from a poisoned lock still holds consistent data.
    fn read_session(&self) -> RwLockReadGuard<'_, Option<SessionData>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Option<SessionData>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_refresh_token(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.refresh_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn persist(&self) {
        let Some(path) = self.session_path() else { return };
        let guard = self.read_session();
        let Some(ref data) = *guard else { return };
        if let Err(err) = Self::save_to(&path, data) {
            warn!(error = %err, "failed to persist session");
        }
    }

    fn save_to(path: &Path, data: &SessionData) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn remove_persisted(&self) {
        let Some(path) = self.session_path() else { return };
        if path.exists() {
            if let Err(err) = std::fs::remove_file(&path) {
                warn!(error = %err, "failed to remove session file");
            }
        }
    }

    fn session_path(&self) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join(SESSION_FILE))
    }
}
