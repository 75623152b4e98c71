//! Broadcaster auth context
//!
//! Process-scoped replacement for ambient "current user" state. Created once,
//! `initialize`d to pick up a persisted session, and handed to whoever needs
//! the signed-in broadcaster (the broadcast controller, the CLI).
//!
//! Credential checks are delegated to an `AuthProvider`; the bundled
//! `LocalAuthProvider` accepts any well-formed credentials after a short
//! simulated round trip.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub channel_name: String,
    /// Channel this broadcaster streams to
    pub channel_id: Uuid,
    #[serde(default)]
    pub is_live: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("channel name is required")]
    MissingChannelName,

    #[error("not signed in")]
    NotSignedIn,

    #[error("persisted session is corrupt: {0}")]
    CorruptSession(String),

    #[error("session persistence failed: {0}")]
    Persistence(String),

    #[error("auth provider error: {0}")]
    Provider(String),
}

// =============================================================================
// Provider
// =============================================================================

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn signup(
        &self,
        email: &str,
        password: &str,
        channel_name: &str,
    ) -> Result<AuthUser, AuthError>;
}

/// Accepts any non-empty credentials; the channel id is derived from the
/// email so the same broadcaster always lands on the same channel.
pub struct LocalAuthProvider {
    latency: Duration,
}

impl LocalAuthProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn channel_id_for(email: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, email.to_ascii_lowercase().as_bytes())
    }

    fn user(email: &str, channel_name: String) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            channel_name,
            channel_id: Self::channel_id_for(email),
            is_live: false,
        }
    }
}

impl Default for LocalAuthProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn login(&self, email: &str, _password: &str) -> Result<AuthUser, AuthError> {
        tokio::time::sleep(self.latency).await;
        let local = email.split('@').next().unwrap_or(email);
        Ok(Self::user(email, format!("{}'s Channel", local)))
    }

    async fn signup(
        &self,
        email: &str,
        _password: &str,
        channel_name: &str,
    ) -> Result<AuthUser, AuthError> {
        tokio::time::sleep(self.latency).await;
        Ok(Self::user(email, channel_name.to_string()))
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    if !email.contains('@') {
        return Err(AuthError::InvalidEmail);
    }
    Ok(())
}

// =============================================================================
// Persistence
// =============================================================================

#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn load(&self) -> Result<Option<AuthUser>, AuthError>;

    async fn save(&self, user: &AuthUser) -> Result<(), AuthError>;

    async fn clear(&self) -> Result<(), AuthError>;
}

/// JSON file holding the signed-in broadcaster
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionPersistence for FileSessionStore {
    async fn load(&self) -> Result<Option<AuthUser>, AuthError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Persistence(e.to_string())),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AuthError::CorruptSession(e.to_string()))
    }

    async fn save(&self, user: &AuthUser) -> Result<(), AuthError> {
        let raw =
            serde_json::to_string_pretty(user).map_err(|e| AuthError::Persistence(e.to_string()))?;
        fs::write(&self.path, raw)
            .await
            .map_err(|e| AuthError::Persistence(e.to_string()))
    }

    async fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Persistence(e.to_string())),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<AuthUser>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionPersistence for MemorySessionStore {
    async fn load(&self) -> Result<Option<AuthUser>, AuthError> {
        Ok(self.slot.lock().clone())
    }

    async fn save(&self, user: &AuthUser) -> Result<(), AuthError> {
        *self.slot.lock() = Some(user.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

// =============================================================================
// Context
// =============================================================================

pub struct AuthContext {
    provider: Arc<dyn AuthProvider>,
    persistence: Arc<dyn SessionPersistence>,
    user: RwLock<Option<AuthUser>>,
    loading: AtomicBool,
}

impl AuthContext {
    pub fn new(provider: Arc<dyn AuthProvider>, persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            provider,
            persistence,
            user: RwLock::new(None),
            loading: AtomicBool::new(true),
        }
    }

    /// Load any persisted session. A corrupt file counts as signed out.
    pub async fn initialize(&self) -> Result<Option<AuthUser>, AuthError> {
        let loaded = match self.persistence.load().await {
            Ok(user) => user,
            Err(AuthError::CorruptSession(details)) => {
                warn!(%details, "discarding corrupt persisted session");
                if let Err(e) = self.persistence.clear().await {
                    warn!(error = %e, "failed to remove corrupt session");
                }
                None
            }
            Err(e) => {
                self.loading.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        if let Some(user) = &loaded {
            info!(email = %user.email, "restored broadcaster session");
        }
        *self.user.write().await = loaded.clone();
        self.loading.store(false, Ordering::SeqCst);
        Ok(loaded)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn current_user(&self) -> Option<AuthUser> {
        self.user.read().await.clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        check_credentials(email, password)?;
        self.authenticate(self.provider.login(email.trim(), password))
            .await
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        channel_name: &str,
    ) -> Result<AuthUser, AuthError> {
        check_credentials(email, password)?;
        if channel_name.trim().is_empty() {
            return Err(AuthError::MissingChannelName);
        }
        self.authenticate(
            self.provider
                .signup(email.trim(), password, channel_name.trim()),
        )
        .await
    }

    async fn authenticate<F>(&self, call: F) -> Result<AuthUser, AuthError>
    where
        F: std::future::Future<Output = Result<AuthUser, AuthError>>,
    {
        self.loading.store(true, Ordering::SeqCst);
        let result = call.await;
        self.loading.store(false, Ordering::SeqCst);
        let user = result?;

        self.store_user(Some(user.clone())).await;
        info!(email = %user.email, channel_id = %user.channel_id, "broadcaster signed in");
        Ok(user)
    }

    pub async fn logout(&self) {
        self.store_user(None).await;
        info!("broadcaster signed out");
    }

    /// Flip the signed-in broadcaster's live flag
    pub async fn set_live(&self, is_live: bool) -> Result<AuthUser, AuthError> {
        let mut guard = self.user.write().await;
        let user = guard.as_mut().ok_or(AuthError::NotSignedIn)?;
        user.is_live = is_live;
        let updated = user.clone();
        drop(guard);

        if let Err(e) = self.persistence.save(&updated).await {
            warn!(error = %e, "failed to persist live flag");
        }
        Ok(updated)
    }

    async fn store_user(&self, user: Option<AuthUser>) {
        let persisted = match &user {
            Some(user) => self.persistence.save(user).await,
            None => self.persistence.clear().await,
        };
        if let Err(e) = persisted {
            warn!(error = %e, "failed to persist broadcaster session");
        }
        *self.user.write().await = user;
    }
}
