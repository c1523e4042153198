/*
[INPUT]:  Identity provider endpoints and persisted session records
[OUTPUT]: Managed authentication sessions
[POS]:    Auth layer - session lifecycle
[UPDATE]: When auth flows or session storage change
*/

pub mod manager;
pub mod provider;
pub mod session;
pub mod state;

pub use manager::{AuthSessionManager, SignUpResult};
pub use provider::{IdentityClient, IdentityUser, SignUpOutcome, TokenGrant};
pub use session::{MemoryVault, Session, SessionStore, SessionVault};
pub use state::{AuthEvent, AuthState, Effect, REFRESH_LEAD, transition};
