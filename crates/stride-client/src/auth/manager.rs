/*
[INPUT]:  Identity client, session store, persistence vault
[OUTPUT]: Managed session lifecycle (sign-in through sign-out)
[POS]:    Auth layer - orchestrates the session state machine
[UPDATE]: When lifecycle flows or refresh scheduling change
*/

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration as StdDuration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::http::{Result, SessionHooks, StrideError};

use super::provider::{IdentityClient, SignUpOutcome};
use super::session::{Session, SessionStore, SessionVault};
use super::state::{AuthEvent, AuthState, Effect, REFRESH_LEAD, transition};

/// Result of a sign-up attempt. When the provider requires email
/// confirmation there is no active session yet.
#[derive(Debug, Clone)]
pub struct SignUpResult {
    pub session: Option<Session>,
    pub confirmation_required: bool,
}

/// Owns the one-and-only session: establishes it, refreshes it
/// proactively and reactively, validates it on resume, and tears it
/// down. All transitions run through the pure table in `auth::state`;
/// this type only executes the effects.
pub struct AuthSessionManager {
    identity: IdentityClient,
    store: SessionStore,
    vault: Arc<dyn SessionVault>,
    state: StdMutex<AuthState>,
    // Serializes refresh attempts; combined with the store's generation
    // counter this collapses concurrent triggers into one network call.
    refresh_gate: Mutex<()>,
    timer: StdMutex<Option<CancellationToken>>,
    weak: Weak<AuthSessionManager>,
}

impl AuthSessionManager {
    pub fn new(
        identity: IdentityClient,
        store: SessionStore,
        vault: Arc<dyn SessionVault>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            identity,
            store,
            vault,
            state: StdMutex::new(AuthState::SignedOut),
            refresh_gate: Mutex::new(()),
            timer: StdMutex::new(None),
            weak: weak.clone(),
        })
    }

    pub fn session_store(&self) -> SessionStore {
        self.store.clone()
    }

    pub fn auth_state(&self) -> AuthState {
        *self.state.lock().unwrap()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.store.current()
    }

    /// Sign in with email/password. On success the session is stored,
    /// persisted, and the proactive refresh timer is armed.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let grant = self.identity.password_sign_in(email, password).await?;
        let session = grant.into_session();
        tracing::info!(user_id = %session.user_id, "signed in");
        self.apply(AuthEvent::Adopted(session.clone())).await;
        Ok(session)
    }

    /// Sign up. If the provider requires email confirmation the result
    /// carries no session and the manager stays signed out.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResult> {
        match self.identity.sign_up(email, password).await? {
            SignUpOutcome::Granted(grant) => {
                let session = grant.into_session();
                tracing::info!(user_id = %session.user_id, "signed up");
                self.apply(AuthEvent::Adopted(session.clone())).await;
                Ok(SignUpResult {
                    session: Some(session),
                    confirmation_required: false,
                })
            }
            SignUpOutcome::ConfirmationRequired => {
                tracing::info!("sign-up pending email confirmation");
                Ok(SignUpResult {
                    session: None,
                    confirmation_required: true,
                })
            }
        }
    }

    /// Clear the session everywhere. Safe to call repeatedly.
    pub async fn sign_out(&self) {
        self.apply(AuthEvent::SignOutRequested).await;
    }

    /// Adopt a persisted session at startup. Corrupt or unreadable
    /// records fall back to signed-out; expired records are discarded
    /// and the storage is cleared.
    pub async fn restore_session(&self) -> Option<Session> {
        let stored = match self.vault.load().await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read persisted session; staying signed out");
                return None;
            }
        };

        let session = stored?;
        if session.is_expired() {
            tracing::info!("persisted session already expired; discarding");
            self.apply(AuthEvent::RestoredExpired).await;
            return None;
        }

        tracing::info!(user_id = %session.user_id, "restored persisted session");
        self.apply(AuthEvent::Adopted(session.clone())).await;
        Some(session)
    }

    /// Exchange the refresh token for a new session.
    ///
    /// Concurrent callers are deduplicated: whoever holds the gate does
    /// the network call, everyone queued behind it observes the bumped
    /// store generation and returns the already-refreshed session.
    pub async fn refresh_session(&self) -> Result<Session> {
        let observed = self.store.generation();
        let _gate = self.refresh_gate.lock().await;

        if self.store.generation() != observed {
            if let Some(session) = self.store.current() {
                tracing::debug!("refresh satisfied by a concurrent refresher");
                return Ok(session);
            }
            // Signed out while we waited.
            return Err(StrideError::SessionExpired);
        }

        let Some(current) = self.store.current() else {
            return Err(StrideError::SessionExpired);
        };
        let Some(refresh_token) = current.refresh_token else {
            tracing::warn!("session has no refresh token; signing out");
            self.apply(AuthEvent::RefreshRejected).await;
            return Err(StrideError::SessionExpired);
        };

        match self.identity.refresh(&refresh_token).await {
            Ok(grant) => {
                let session = grant.into_session();
                tracing::info!(user_id = %session.user_id, "session refreshed");
                self.apply(AuthEvent::Adopted(session.clone())).await;
                Ok(session)
            }
            Err(err) if err.is_auth_error() => {
                tracing::warn!(error = %err, "refresh rejected by identity provider; signing out");
                self.apply(AuthEvent::RefreshRejected).await;
                Err(StrideError::SessionExpired)
            }
            // Transient failure: keep the session, let a later trigger
            // retry.
            Err(err) => Err(err),
        }
    }

    /// Foreground-resume check: validate the session remotely, refresh
    /// if it is close to expiry. Network failures never sign the user
    /// out; only an explicit rejection does.
    pub async fn handle_resume(&self) -> Result<()> {
        let Some(session) = self.store.current() else {
            return Ok(());
        };

        match self.identity.validate(&session.access_token).await {
            Ok(_) => {
                if session.expires_within(REFRESH_LEAD) {
                    if let Err(err) = self.refresh_session().await {
                        tracing::warn!(error = %err, "near-expiry refresh on resume failed");
                    }
                }
                Ok(())
            }
            Err(StrideError::SessionExpired) => {
                tracing::warn!("session invalid on resume; signing out");
                self.apply(AuthEvent::ValidationInvalid).await;
                Err(StrideError::SessionExpired)
            }
            Err(err) => {
                tracing::debug!(error = %err, "resume validation inconclusive; keeping session");
                Ok(())
            }
        }
    }

    /// Run one transition and execute its effects in order.
    async fn apply(&self, event: AuthEvent) {
        let effects = {
            let mut state = self.state.lock().unwrap();
            let (next, effects) = transition(*state, &event);
            *state = next;
            effects
        };

        let adopted = match &event {
            AuthEvent::Adopted(session) => Some(session.clone()),
            _ => None,
        };

        for effect in effects {
            match effect {
                Effect::StoreSession => {
                    if let Some(session) = adopted.clone() {
                        self.store.set(session);
                    }
                }
                Effect::Persist => {
                    if let Some(session) = adopted.as_ref() {
                        // Persistence is best-effort; the in-memory
                        // session stays authoritative.
                        if let Err(err) = self.vault.store(session).await {
                            tracing::warn!(error = %err, "failed to persist session");
                        }
                    }
                }
                Effect::ArmRefreshTimer(fire_at) => self.arm_refresh_timer(fire_at),
                Effect::CancelRefreshTimer => self.cancel_refresh_timer(),
                Effect::ClearSession => self.store.clear(),
                Effect::ClearPersisted => {
                    if let Err(err) = self.vault.clear().await {
                        tracing::warn!(error = %err, "failed to clear persisted session");
                    }
                }
            }
        }
    }

    /// Arm the proactive refresh timer. Exactly one timer is live at a
    /// time; a target already in the past fires immediately.
    fn arm_refresh_timer(&self, fire_at: DateTime<Utc>) {
        self.cancel_refresh_timer();

        let token = CancellationToken::new();
        *self.timer.lock().unwrap() = Some(token.clone());

        let delay = (fire_at - Utc::now())
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        let weak = self.weak.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let Some(manager) = weak.upgrade() else {
                return;
            };
            tracing::debug!("proactive refresh timer fired");
            if let Err(err) = manager.refresh_session().await {
                tracing::warn!(error = %err, "proactive session refresh failed");
            }
        });
    }

    fn cancel_refresh_timer(&self) {
        if let Some(token) = self.timer.lock().unwrap().take() {
            token.cancel();
        }
    }
}

impl Drop for AuthSessionManager {
    fn drop(&mut self) {
        self.cancel_refresh_timer();
    }
}

/// The gateway's view of the session layer: refresh on TOKEN_EXPIRED,
/// sign out on anything unrecoverable.
#[async_trait]
impl SessionHooks for AuthSessionManager {
    async fn refresh_access_token(&self) -> Result<String> {
        self.refresh_session()
            .await
            .map(|session| session.access_token)
    }

    async fn handle_unauthorized(&self) {
        tracing::warn!("gateway reported unauthorized; signing out");
        self.sign_out().await;
    }
}
