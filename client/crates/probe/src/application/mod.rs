//! Application Layer
//!
//! Use cases and application services.

pub mod check_connection;
pub mod collect_fingerprint;
pub mod config;
pub mod detect_real_ip;
pub mod surfaces;

// Re-exports
pub use check_connection::{CheckConnectionOutput, CheckConnectionUseCase};
pub use collect_fingerprint::CollectFingerprintUseCase;
pub use config::{DEFAULT_STUN_SERVERS, ProbeConfig};
pub use detect_real_ip::DetectRealIpUseCase;
