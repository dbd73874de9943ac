//! Application Configuration
//!
//! Configuration for the probe application layer.

use std::time::Duration;

use crate::domain::value_objects::{IceServer, RtcConfiguration};

/// Public STUN servers queried by default (no TURN)
pub const DEFAULT_STUN_SERVERS: [&str; 5] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun.cloudflare.com:3478",
    "stun:stun.nextcloud.com:443",
];

/// Probe application configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// ICE servers handed to the peer connection
    pub ice_servers: Vec<IceServer>,
    /// Hard cap on WebRTC gathering; the only finaliser of the probe
    pub webrtc_timeout: Duration,
    /// Hard cap on the audio sub-probe
    pub audio_timeout: Duration,
    /// Label of the inert data channel
    pub data_channel_label: String,
    /// Per-server answer cap of the native STUN gatherer
    pub stun_response_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ice_servers: DEFAULT_STUN_SERVERS.iter().map(|url| IceServer::new(*url)).collect(),
            webrtc_timeout: Duration::from_millis(3000),
            audio_timeout: Duration::from_millis(1000),
            data_channel_label: "ip-detection".to_string(),
            stun_response_timeout: Duration::from_millis(2500),
        }
    }
}

impl ProbeConfig {
    /// Replace the ICE server list
    pub fn with_stun_servers<I, S>(self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ice_servers: urls.into_iter().map(IceServer::new).collect(),
            ..self
        }
    }

    /// Peer connection configuration derived from this config
    pub fn rtc_configuration(&self) -> RtcConfiguration {
        RtcConfiguration {
            ice_servers: self.ice_servers.clone(),
        }
    }

    /// Per-server STUN cap, never beyond the overall WebRTC deadline
    pub fn effective_stun_timeout(&self) -> Duration {
        self.stun_response_timeout.min(self.webrtc_timeout)
    }

    pub fn webrtc_timeout_ms(&self) -> i64 {
        self.webrtc_timeout.as_millis() as i64
    }

    pub fn audio_timeout_ms(&self) -> i64 {
        self.audio_timeout.as_millis() as i64
    }
}
