/*
[INPUT]:  Access/refresh tokens and expiration timestamps
[OUTPUT]: Thread-safe session storage and persistence boundary
[POS]:    Auth layer - session data and token lifecycle storage
[UPDATE]: When adding session fields or changing storage strategy
*/

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::http::Result;

/// The client's proof of authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// True when the session expires within `window` from now.
    pub fn expires_within(&self, window: Duration) -> bool {
        Utc::now() + window >= self.expires_at
    }
}

/// Thread-safe holder for the single active session.
///
/// Writers replace the whole record under the lock; readers always see
/// either the old or the new session, never a mix. The generation
/// counter lets a refresher detect that someone else already swapped in
/// a newer session while it was waiting its turn.
#[derive(Debug, Clone)]
pub struct SessionStore {
    data: Arc<RwLock<Option<Session>>>,
    generation: Arc<AtomicU64>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn set(&self, session: Session) {
        let mut guard = self.data.write().unwrap();
        *guard = Some(session);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        let mut guard = self.data.write().unwrap();
        *guard = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<Session> {
        self.data.read().unwrap().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.data
            .read()
            .unwrap()
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.data.read().unwrap().is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Persistence boundary for the session record.
///
/// Implementations must tolerate corrupt stored data by returning
/// `Ok(None)` from `load`; a damaged record is treated as signed-out,
/// never as a startup failure.
#[async_trait]
pub trait SessionVault: Send + Sync {
    async fn load(&self) -> Result<Option<Session>>;
    async fn store(&self, session: &Session) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// In-memory vault used by tests and ephemeral setups.
#[derive(Debug, Default)]
pub struct MemoryVault {
    slot: tokio::sync::Mutex<Option<Session>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: tokio::sync::Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionVault for MemoryVault {
    async fn load(&self) -> Result<Option<Session>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn store(&self, session: &Session) -> Result<()> {
        *self.slot.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.lock().await = None;
        Ok(())
    }
}
