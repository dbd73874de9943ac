//! Probe Error Types
//!
//! Every port call inside the probe returns [`ProbeResult`]. The probe use
//! cases absorb these errors into sentinel values; only the reporting flow
//! surfaces them, and even there they become a verdict.

use platform::stun::StunError;
use thiserror::Error;

/// Probe-specific result type alias
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Probe-specific error variants
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No peer-connection constructor in this environment
    #[error("WebRTC not supported")]
    WebRtcUnsupported,

    /// ICE server URL is not a usable `stun:` URL
    #[error("Invalid ICE server URL: {0}")]
    InvalidIceServer(String),

    /// Operation on a connection that was already closed
    #[error("Peer connection is closed")]
    ConnectionClosed,

    /// Offer creation or local description failed
    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    /// STUN host resolved to no IPv4 address
    #[error("No IPv4 address for STUN server {0}")]
    Unresolvable(String),

    /// STUN server did not answer within the per-server cap
    #[error("STUN server {0} did not answer in time")]
    StunTimeout(String),

    /// STUN decoding error
    #[error("STUN error: {0}")]
    Stun(#[from] StunError),

    /// Canvas / WebGL / audio surface failure
    #[error("Surface error: {0}")]
    Surface(String),

    /// Socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Request rejected with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
}

impl ProbeError {
    /// Whether the backend refused the client outright (HTTP 403)
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ProbeError::Rejected { status: 403, .. })
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            ProbeError::Rejected { status, message } => {
                tracing::warn!(
                    status = *status,
                    message = message.as_deref().unwrap_or_default(),
                    "Fingerprint endpoint rejected request"
                );
            }
            ProbeError::Http(e) => {
                tracing::warn!(error = %e, "Fingerprint endpoint unreachable");
            }
            ProbeError::Negotiation(_) | ProbeError::InvalidIceServer(_) => {
                tracing::warn!(error = %self, "WebRTC setup failed");
            }
            _ => {
                tracing::debug!(error = %self, "Probe error");
            }
        }
    }
}
