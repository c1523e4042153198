/*
[INPUT]:  Current auth state and lifecycle events
[OUTPUT]: Next state plus the side effects to perform
[POS]:    Auth layer - pure session state machine
[UPDATE]: When lifecycle transitions or their effects change
*/

use chrono::{DateTime, Duration, Utc};

use super::session::Session;

/// Lead time before expiry at which a session is refreshed proactively.
pub const REFRESH_LEAD: Duration = Duration::minutes(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    Active { expires_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// A session was established or replaced: sign-in, sign-up with an
    /// immediate grant, restore of a still-valid record, or refresh.
    Adopted(Session),
    /// A persisted record was found but already expired.
    RestoredExpired,
    /// The identity provider explicitly rejected a refresh attempt.
    RefreshRejected,
    /// Remote validation said the session is invalid.
    ValidationInvalid,
    /// The user asked to sign out.
    SignOutRequested,
}

/// Side effects the caller must perform after a transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StoreSession,
    Persist,
    ArmRefreshTimer(DateTime<Utc>),
    CancelRefreshTimer,
    ClearSession,
    ClearPersisted,
}

/// Pure transition function for the session lifecycle.
///
/// `SignedOut -> Active` on any adoption, `Active -> Active` on
/// refresh, and every failure/sign-out path collapses to `SignedOut`.
/// The timer effect always targets `expires_at - REFRESH_LEAD`; a
/// target already in the past means "refresh now" to the executor.
pub fn transition(state: AuthState, event: &AuthEvent) -> (AuthState, Vec<Effect>) {
    match event {
        AuthEvent::Adopted(session) => (
            AuthState::Active {
                expires_at: session.expires_at,
            },
            vec![
                Effect::CancelRefreshTimer,
                Effect::StoreSession,
                Effect::Persist,
                Effect::ArmRefreshTimer(session.expires_at - REFRESH_LEAD),
            ],
        ),
        AuthEvent::RestoredExpired => (AuthState::SignedOut, vec![Effect::ClearPersisted]),
        AuthEvent::RefreshRejected
        | AuthEvent::ValidationInvalid
        | AuthEvent::SignOutRequested => match state {
            // Sign-out is idempotent: repeating it from SignedOut does
            // nothing.
            AuthState::SignedOut if *event == AuthEvent::SignOutRequested => {
                (AuthState::SignedOut, Vec::new())
            }
            _ => (
                AuthState::SignedOut,
                vec![
                    Effect::CancelRefreshTimer,
                    Effect::ClearSession,
                    Effect::ClearPersisted,
                ],
            ),
        },
    }
}
