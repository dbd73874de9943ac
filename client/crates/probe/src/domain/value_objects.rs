//! Domain Value Objects
//!
//! Immutable value types for the probe domain.

use std::fmt;

/// `navigator.*` facts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserInfo {
    pub user_agent: String,
    pub language: String,
    pub languages: Vec<String>,
    pub platform: String,
    pub cookie_enabled: bool,
    pub on_line: bool,
    pub hardware_concurrency: u32,
}

/// `screen.*` facts; all zero on a headless host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    pub pixel_depth: u32,
    pub avail_width: u32,
    pub avail_height: u32,
}

/// Timezone facts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimezoneInfo {
    /// Minutes, JavaScript sign convention (UTC − local)
    pub offset: i32,
    /// IANA zone name
    pub zone: String,
}

/// ICE server entry (STUN only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    pub urls: String,
}

impl IceServer {
    pub fn new(urls: impl Into<String>) -> Self {
        Self { urls: urls.into() }
    }
}

/// Peer connection configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtcConfiguration {
    pub ice_servers: Vec<IceServer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpType {
    Offer,
}

/// Session description produced during negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub sdp: String,
}

/// A single ICE candidate, as carried by an `icecandidate` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    /// SDP candidate attribute, e.g. `candidate:1 1 UDP 2122260223 192.168.1.5 54321 typ host`
    pub candidate: String,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
        }
    }
}

/// Event stream item of a peer connection's candidate subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IceCandidateEvent {
    Candidate(IceCandidate),
    /// The end-of-candidates marker (`event.candidate === null`)
    GatheringComplete,
}

/// Whether an address is private/special-purpose or publicly routable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressScope {
    Local,
    Public,
}

/// Oscillator waveform of the audio fingerprint graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorType {
    Triangle,
}

/// Audio graph: oscillator → analyser → script processor → gain → destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioGraph {
    pub oscillator: OscillatorType,
    pub frequency_hz: f32,
    pub buffer_size: usize,
    pub input_channels: u32,
    pub output_channels: u32,
    pub gain: f32,
}

impl AudioGraph {
    /// The fixed graph used for audio fingerprinting (muted output)
    pub const FINGERPRINT: AudioGraph = AudioGraph {
        oscillator: OscillatorType::Triangle,
        frequency_hz: 10_000.0,
        buffer_size: 4096,
        input_channels: 1,
        output_channels: 1,
        gain: 0.0,
    };
}

/// WebGL parameters exposed by `WEBGL_debug_renderer_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebGlParameter {
    UnmaskedVendor,
    UnmaskedRenderer,
}

/// Which rendering surface a sub-fingerprint came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Canvas,
    WebGl,
    Audio,
}

impl SurfaceKind {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            SurfaceKind::Canvas => "canvas",
            SurfaceKind::WebGl => "webgl",
            SurfaceKind::Audio => "audio",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Tagged outcome of a surface sub-probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOutcome {
    Hash(String),
    /// Capability absent (no context / no constructor)
    Unavailable,
    /// Context present, identifying extension missing
    Limited,
    TimedOut,
    Failed(String),
}

/// Sub-fingerprint of one surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceFingerprint {
    pub kind: SurfaceKind,
    pub outcome: SurfaceOutcome,
}

impl SurfaceFingerprint {
    pub fn new(kind: SurfaceKind, outcome: SurfaceOutcome) -> Self {
        Self { kind, outcome }
    }

    pub fn hash(&self) -> Option<&str> {
        match &self.outcome {
            SurfaceOutcome::Hash(h) => Some(h),
            _ => None,
        }
    }

    /// Wire rendering: the hash itself, or the surface's sentinel string
    pub fn wire_value(&self) -> String {
        use SurfaceKind::*;
        use SurfaceOutcome::*;
        let sentinel = match (&self.outcome, self.kind) {
            (Hash(h), _) => return h.clone(),
            (Unavailable, Canvas) => "no-canvas",
            (Unavailable, WebGl) => "no-webgl",
            (Unavailable, Audio) => "no-audio",
            (Limited, WebGl) => "webgl-limited",
            (TimedOut, Audio) => "audio-timeout",
            (Failed(_), Canvas) | (Limited, Canvas) | (TimedOut, Canvas) => "canvas-error",
            (Failed(_), WebGl) | (TimedOut, WebGl) => "webgl-error",
            (Failed(_), Audio) | (Limited, Audio) => "audio-error",
        };
        sentinel.to_string()
    }
}

/// Backend answer to a VPN/proxy verification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub success: bool,
    pub message: Option<String>,
}
