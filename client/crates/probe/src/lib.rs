//! WebRTC IP-Leak Probe
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, pure services and port traits
//! - `application/` - Use cases (detect real IP, collect fingerprint, check connection)
//! - `infra/` - Native adapters (STUN gatherer, host facts, offline audio, HTTP reporter)
//! - `presentation/` - Wire DTOs
//!
//! ## Probe Model
//! - One peer connection per call, negotiated only so ICE gathering runs
//! - A single deadline ends gathering; nothing else does
//! - Every sub-probe degrades to a tagged outcome, never to an error
//! - Only the reporting flow talks to the network beyond STUN

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::{
    CheckConnectionOutput, CheckConnectionUseCase, CollectFingerprintUseCase, DetectRealIpUseCase,
    ProbeConfig,
};
pub use domain::entities::{ClientFingerprint, ConnectionVerdict, WebRtcResult};
pub use error::{ProbeError, ProbeResult};
pub use infra::{HttpFingerprintReporter, NativeEnvironment, StunPeerConnector};
pub use presentation::dto::{CheckConnectionPayload, FingerprintPayload};

#[cfg(test)]
mod tests;
