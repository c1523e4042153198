/*
[INPUT]:  Public API exports for the stride-cli crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use config::AppConfig;
pub use storage::{FileVault, Profile};
pub use store::TaskStore;
