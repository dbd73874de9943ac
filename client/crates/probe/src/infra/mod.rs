//! Infrastructure Layer
//!
//! Native adapters for the probe ports.

pub mod http_reporter;
pub mod native_env;
pub mod offline_audio;
pub mod stun_peer;

pub use http_reporter::HttpFingerprintReporter;
pub use native_env::NativeEnvironment;
pub use offline_audio::OfflineAudioContext;
pub use stun_peer::{StunPeerConnection, StunPeerConnector};
