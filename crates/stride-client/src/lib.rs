/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Stride client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod poll;
pub mod slug;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    AuthSessionManager,
    IdentityClient,
    MemoryVault,
    Session,
    SessionStore,
    SessionVault,
    SignUpResult,
};

// Re-export commonly used types from http
pub use http::{
    ApiGateway,
    GatewayConfig,
    Result,
    SessionHooks,
    StrideError,
};

// Re-export the polling surface
pub use poll::{
    EnrichmentContext,
    EnrichmentPoller,
    PollConfig,
    QueuePoller,
    QueueStatusSource,
};

// Re-export all types
pub use types::*;
