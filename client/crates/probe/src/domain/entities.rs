//! Domain Entities
//!
//! Snapshot values produced by the probe. None of them has an identity
//! beyond the moment it was taken.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::domain::services::address_scope;
use crate::domain::value_objects::{
    AddressScope, BrowserInfo, ScreenInfo, SurfaceFingerprint, TimezoneInfo,
};

/// Outcome of one WebRTC address-leak probe
///
/// `local_ips` and `public_ips` always partition `ips`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRtcResult {
    success: bool,
    ips: BTreeSet<Ipv4Addr>,
    local_ips: BTreeSet<Ipv4Addr>,
    public_ips: BTreeSet<Ipv4Addr>,
    error: Option<String>,
    timestamp: i64,
}

impl WebRtcResult {
    /// Build a result from the observed addresses, classifying each one
    pub fn from_observed(ips: BTreeSet<Ipv4Addr>, started_at_ms: i64) -> Self {
        let (local_ips, public_ips) = ips
            .iter()
            .partition(|ip| address_scope(**ip) == AddressScope::Local);

        Self {
            success: !ips.is_empty(),
            ips,
            local_ips,
            public_ips,
            error: None,
            timestamp: started_at_ms,
        }
    }

    /// A result that observed nothing because the probe could not run
    pub fn failed(error: impl Into<String>, started_at_ms: i64) -> Self {
        Self {
            success: false,
            ips: BTreeSet::new(),
            local_ips: BTreeSet::new(),
            public_ips: BTreeSet::new(),
            error: Some(error.into()),
            timestamp: started_at_ms,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn ips(&self) -> &BTreeSet<Ipv4Addr> {
        &self.ips
    }

    pub fn local_ips(&self) -> &BTreeSet<Ipv4Addr> {
        &self.local_ips
    }

    pub fn public_ips(&self) -> &BTreeSet<Ipv4Addr> {
        &self.public_ips
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Epoch milliseconds at which the probe started
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Aggregate client snapshot handed to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFingerprint {
    pub webrtc: WebRtcResult,
    pub browser: BrowserInfo,
    pub screen: ScreenInfo,
    pub timezone: TimezoneInfo,
    pub canvas: SurfaceFingerprint,
    pub webgl: SurfaceFingerprint,
    pub audio: SurfaceFingerprint,
    pub timestamp: i64,
}

impl ClientFingerprint {
    /// SHA-256 (hex) over the signals that stay stable for one device install
    ///
    /// Network addresses and timestamps are excluded.
    pub fn device_digest(&self) -> String {
        let material = [
            self.canvas.wire_value(),
            self.webgl.wire_value(),
            self.audio.wire_value(),
            self.browser.platform.clone(),
            self.browser.hardware_concurrency.to_string(),
            format!(
                "{}x{}x{}",
                self.screen.width, self.screen.height, self.screen.color_depth
            ),
            self.timezone.zone.clone(),
        ]
        .join("\n");

        platform::crypto::sha256_hex(material.as_bytes())
    }
}

/// Result of reporting a fingerprint before publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionVerdict {
    /// Nothing suspicious, or nothing to verify
    Clear,
    /// Backend flagged VPN/proxy usage
    Blocked { reason: String },
    /// Reporting failed; the backend could not decide
    Inconclusive { reason: String },
}

impl ConnectionVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, ConnectionVerdict::Blocked { .. })
    }
}
