//! Port Traits
//!
//! Interfaces to the execution environment. A browser, a native host or a
//! test double plugs in behind these.

use std::net::Ipv4Addr;

use tokio::sync::{mpsc, oneshot};

use crate::domain::entities::ClientFingerprint;
use crate::domain::value_objects::{
    AudioGraph, BrowserInfo, IceCandidateEvent, RtcConfiguration, ScreenInfo,
    SessionDescription, TimezoneInfo, VerifyOutcome, WebGlParameter,
};
use crate::error::ProbeResult;

/// One peer connection, used only to trigger ICE gathering
#[trait_variant::make(PeerConnection: Send)]
pub trait LocalPeerConnection {
    /// Subscribe to candidate events; `None` once the stream was taken
    fn ice_candidates(&mut self) -> Option<mpsc::UnboundedReceiver<IceCandidateEvent>>;

    /// Open a data channel so the offer carries a media section
    fn create_data_channel(&mut self, label: &str) -> ProbeResult<()>;

    async fn create_offer(&mut self) -> ProbeResult<SessionDescription>;

    /// Apply the offer locally; candidate gathering starts here
    async fn set_local_description(&mut self, description: SessionDescription)
    -> ProbeResult<()>;

    fn close(&mut self);
}

/// Peer-connection constructor
pub trait PeerConnector: Send + Sync {
    type Connection: PeerConnection;

    fn connect(&self, configuration: &RtcConfiguration) -> ProbeResult<Self::Connection>;
}

/// 2D canvas rendering context
pub trait Canvas2d {
    fn resize(&mut self, width: u32, height: u32);
    fn set_text_baseline(&mut self, baseline: &str);
    fn set_font(&mut self, font: &str);
    fn set_fill_style(&mut self, style: &str);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> ProbeResult<()>;
    fn to_data_url(&self) -> ProbeResult<String>;
}

/// WebGL rendering context
pub trait WebGlContext {
    fn has_extension(&self, name: &str) -> bool;
    fn parameter(&self, parameter: WebGlParameter) -> ProbeResult<String>;
}

/// Audio context able to run the fingerprint graph
pub trait AudioContext: Send {
    /// Build and start `graph`; the receiver yields the first processed buffer
    fn start(&mut self, graph: &AudioGraph) -> ProbeResult<oneshot::Receiver<Vec<f32>>>;
    fn stop(&mut self) -> ProbeResult<()>;
    fn close(&mut self) -> ProbeResult<()>;
}

/// Everything the fingerprint samples besides WebRTC
///
/// `create_*` return `Ok(None)` when the capability is absent and `Err`
/// when it exists but failed to initialise.
pub trait BrowserEnvironment: Send + Sync {
    type Canvas: Canvas2d;
    type WebGl: WebGlContext;
    type Audio: AudioContext;

    fn browser(&self) -> BrowserInfo;
    fn screen(&self) -> ScreenInfo;
    fn timezone(&self) -> TimezoneInfo;

    fn create_canvas(&self) -> ProbeResult<Option<Self::Canvas>>;
    fn create_webgl_context(&self) -> ProbeResult<Option<Self::WebGl>>;
    fn create_audio_context(&self) -> ProbeResult<Option<Self::Audio>>;
}

/// Fingerprint endpoints of the backend
#[trait_variant::make(FingerprintReporter: Send)]
pub trait LocalFingerprintReporter {
    /// `POST /api/fingerprint/submit`
    async fn submit(&self, fingerprint: &ClientFingerprint) -> ProbeResult<()>;

    /// `POST /api/fingerprint/verify` with the leaked public addresses
    async fn verify(&self, public_ips: &[Ipv4Addr]) -> ProbeResult<VerifyOutcome>;
}
