//! Collect Fingerprint Use Case
//!
//! Aggregates the WebRTC probe, environment facts and the surface
//! sub-probes into one [`ClientFingerprint`].

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::ProbeConfig;
use crate::application::detect_real_ip::DetectRealIpUseCase;
use crate::application::surfaces::{audio_fingerprint, canvas_fingerprint, webgl_fingerprint};
use crate::domain::entities::ClientFingerprint;
use crate::domain::ports::{BrowserEnvironment, PeerConnector};

/// Collect fingerprint use case
pub struct CollectFingerprintUseCase<C, E>
where
    C: PeerConnector,
    E: BrowserEnvironment,
{
    detect_real_ip: DetectRealIpUseCase<C>,
    environment: Arc<E>,
    config: Arc<ProbeConfig>,
}

impl<C, E> CollectFingerprintUseCase<C, E>
where
    C: PeerConnector,
    E: BrowserEnvironment,
{
    pub fn new(connector: Option<Arc<C>>, environment: Arc<E>, config: Arc<ProbeConfig>) -> Self {
        Self {
            detect_real_ip: DetectRealIpUseCase::new(connector, config.clone()),
            environment,
            config,
        }
    }

    /// Never fails; every degraded signal is carried as a sentinel
    pub async fn execute(&self) -> ClientFingerprint {
        let webrtc = self.detect_real_ip.execute().await;

        let browser = self.environment.browser();
        let screen = self.environment.screen();
        let timezone = self.environment.timezone();

        let canvas = canvas_fingerprint(self.environment.as_ref());
        let webgl = webgl_fingerprint(self.environment.as_ref());
        let audio = audio_fingerprint(self.environment.as_ref(), self.config.audio_timeout).await;

        let fingerprint = ClientFingerprint {
            webrtc,
            browser,
            screen,
            timezone,
            canvas,
            webgl,
            audio,
            timestamp: Utc::now().timestamp_millis(),
        };

        tracing::info!(
            device = %fingerprint.device_digest(),
            canvas = fingerprint.canvas.hash().is_some(),
            webgl = fingerprint.webgl.hash().is_some(),
            audio = fingerprint.audio.hash().is_some(),
            audio_timeout_ms = self.config.audio_timeout_ms(),
            "Client fingerprint collected"
        );

        fingerprint
    }
}
