/*
[INPUT]:  HTTP gateway configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing gateway behavior
*/

pub mod client;
pub mod error;
pub mod prefs;
pub mod queue;
pub mod steps;
pub mod tasks;

pub use client::{ApiGateway, GatewayConfig, SessionHooks};
pub use error::{Result, StrideError};
