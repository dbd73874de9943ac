//! Wire DTOs (Data Transfer Objects)
//!
//! Field names follow the JSON the browser client sends, so a native
//! fingerprint is indistinguishable on the wire.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::application::check_connection::CheckConnectionOutput;
use crate::domain::entities::{ClientFingerprint, ConnectionVerdict, WebRtcResult};
use crate::domain::value_objects::{BrowserInfo, ScreenInfo, TimezoneInfo, VerifyOutcome};

/// `webrtc` section of the fingerprint
#[derive(Debug, Clone, Serialize)]
pub struct WebRtcPayload {
    pub ips: Vec<Ipv4Addr>,
    #[serde(rename = "localIPs")]
    pub local_ips: Vec<Ipv4Addr>,
    #[serde(rename = "publicIPs")]
    pub public_ips: Vec<Ipv4Addr>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
}

impl From<&WebRtcResult> for WebRtcPayload {
    fn from(result: &WebRtcResult) -> Self {
        Self {
            ips: result.ips().iter().copied().collect(),
            local_ips: result.local_ips().iter().copied().collect(),
            public_ips: result.public_ips().iter().copied().collect(),
            success: result.success(),
            error: result.error().map(str::to_string),
            timestamp: result.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserPayload {
    pub user_agent: String,
    pub language: String,
    pub languages: Vec<String>,
    pub platform: String,
    pub cookie_enabled: bool,
    pub on_line: bool,
    pub hardware_concurrency: u32,
}

impl From<&BrowserInfo> for BrowserPayload {
    fn from(info: &BrowserInfo) -> Self {
        Self {
            user_agent: info.user_agent.clone(),
            language: info.language.clone(),
            languages: info.languages.clone(),
            platform: info.platform.clone(),
            cookie_enabled: info.cookie_enabled,
            on_line: info.on_line,
            hardware_concurrency: info.hardware_concurrency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenPayload {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    pub pixel_depth: u32,
    pub avail_width: u32,
    pub avail_height: u32,
}

impl From<&ScreenInfo> for ScreenPayload {
    fn from(screen: &ScreenInfo) -> Self {
        Self {
            width: screen.width,
            height: screen.height,
            color_depth: screen.color_depth,
            pixel_depth: screen.pixel_depth,
            avail_width: screen.avail_width,
            avail_height: screen.avail_height,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimezonePayload {
    pub offset: i32,
    pub zone: String,
}

impl From<&TimezoneInfo> for TimezonePayload {
    fn from(timezone: &TimezoneInfo) -> Self {
        Self {
            offset: timezone.offset,
            zone: timezone.zone.clone(),
        }
    }
}

/// Body of POST /api/fingerprint/submit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintPayload {
    pub webrtc: WebRtcPayload,
    pub browser: BrowserPayload,
    pub screen: ScreenPayload,
    pub timezone: TimezonePayload,
    pub canvas: String,
    pub webgl: String,
    pub audio: String,
    pub device_digest: String,
    pub timestamp: i64,
}

impl From<&ClientFingerprint> for FingerprintPayload {
    fn from(fingerprint: &ClientFingerprint) -> Self {
        Self {
            webrtc: (&fingerprint.webrtc).into(),
            browser: (&fingerprint.browser).into(),
            screen: (&fingerprint.screen).into(),
            timezone: (&fingerprint.timezone).into(),
            canvas: fingerprint.canvas.wire_value(),
            webgl: fingerprint.webgl.wire_value(),
            audio: fingerprint.audio.wire_value(),
            device_digest: fingerprint.device_digest(),
            timestamp: fingerprint.timestamp,
        }
    }
}

/// Body of POST /api/fingerprint/verify
#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    #[serde(rename = "webrtcIPs")]
    pub webrtc_ips: Vec<Ipv4Addr>,
}

/// Response of POST /api/fingerprint/verify
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<VerifyResponse> for VerifyOutcome {
    fn from(response: VerifyResponse) -> Self {
        Self {
            success: response.success,
            message: response.message,
        }
    }
}

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

/// Verdict as printed by the CLI
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum VerdictPayload {
    Clear,
    Blocked { reason: String },
    Inconclusive { reason: String },
}

impl From<&ConnectionVerdict> for VerdictPayload {
    fn from(verdict: &ConnectionVerdict) -> Self {
        match verdict {
            ConnectionVerdict::Clear => VerdictPayload::Clear,
            ConnectionVerdict::Blocked { reason } => VerdictPayload::Blocked {
                reason: reason.clone(),
            },
            ConnectionVerdict::Inconclusive { reason } => VerdictPayload::Inconclusive {
                reason: reason.clone(),
            },
        }
    }
}

/// Fingerprint plus verdict of a reported run
#[derive(Debug, Clone, Serialize)]
pub struct CheckConnectionPayload {
    pub fingerprint: FingerprintPayload,
    pub verdict: VerdictPayload,
}

impl From<&CheckConnectionOutput> for CheckConnectionPayload {
    fn from(output: &CheckConnectionOutput) -> Self {
        Self {
            fingerprint: (&output.fingerprint).into(),
            verdict: (&output.verdict).into(),
        }
    }
}
