//! Authenticated session and token persistence
//!
//! [`SessionManager`] owns the current [`Session`] and writes the bearer
//! token through a [`TokenStore`]. On startup, [`SessionManager::restore`]
//! validates a stored token against `GET /auth/profile`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::api::{ApiClient, ApiError, UserProfile};
use crate::config::sanitize;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token storage error: {0}")]
    Storage(String),

    /// Profile check could not complete; the stored token was kept
    #[error("Session check failed: {0}")]
    Api(#[from] ApiError),
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

/// Storage port for the bearer token
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, SessionError>;
    fn save(&self, token: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// Token persisted as a single-line file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %self.path.display(), "Token saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process token store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.slot().clone())
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot() = None;
        Ok(())
    }
}

/// Logged-in user and their bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &sanitize(&self.token))
            .field("user", &self.user)
            .finish()
    }
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    /// Copy of `client` that authenticates as this session
    pub fn client(&self, client: &ApiClient) -> ApiClient {
        client.clone().with_token(self.token.clone())
    }
}

pub struct SessionManager<S: TokenStore> {
    store: S,
    current: Option<Session>,
}

impl<S: TokenStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a session from a token and user returned by login/register
    pub fn login(&mut self, token: &str, user: UserProfile) -> Result<Session, SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::NotAuthenticated);
        }
        self.store.save(token)?;

        let session = Session {
            token: token.to_string(),
            user,
        };
        tracing::info!(user_id = %session.user.id, token = %sanitize(&session.token), "Session started");
        self.current = Some(session.clone());
        Ok(session)
    }

    /// `POST /auth/login` followed by [`login`](Self::login)
    pub async fn login_with_credentials(
        &mut self,
        client: &ApiClient,
        email: &str,
        password: &str,
    ) -> Result<Session, SessionError> {
        let auth = client.login(email, password).await?;
        self.login(&auth.token, auth.user)
    }

    /// Drop the session and forget the stored token
    pub fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(session) = self.current.take() {
            tracing::info!(user_id = %session.user.id, "Session ended");
        }
        self.store.clear()
    }

    /// Replace the cached user after a profile change
    pub fn update_user(&mut self, user: UserProfile) -> Result<(), SessionError> {
        let session = self.current.as_mut().ok_or(SessionError::NotAuthenticated)?;
        session.user = user;
        Ok(())
    }

    /// Re-establish a session from the stored token.
    ///
    /// Returns `Ok(None)` when no token is stored or the backend rejected
    /// it (the token is then cleared). Transient failures keep the token
    /// and return `Err`.
    pub async fn restore(&mut self, client: &ApiClient) -> Result<Option<Session>, SessionError> {
        let Some(token) = self.store.load()? else {
            tracing::debug!("No stored token, starting logged out");
            return Ok(None);
        };

        match client.clone().with_token(token.clone()).profile().await {
            Ok(user) => {
                let session = Session { token, user };
                tracing::info!(user_id = %session.user.id, "Session restored");
                self.current = Some(session.clone());
                Ok(Some(session))
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Could not verify stored token, keeping it");
                Err(e.into())
            }
            Err(e) => {
                tracing::warn!(error = %e, token = %sanitize(&token), "Stored token rejected, clearing it");
                self.current = None;
                self.store.clear()?;
                Ok(None)
            }
        }
    }
}
