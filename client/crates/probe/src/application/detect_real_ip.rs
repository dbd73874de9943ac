//! Detect Real IP Use Case
//!
//! Drives one peer connection through negotiation so that ICE gathering
//! leaks the host's addresses, collects them until a single deadline and
//! classifies them. Always resolves; failures land in `WebRtcResult::error`.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::application::config::ProbeConfig;
use crate::domain::entities::WebRtcResult;
use crate::domain::ports::{PeerConnection, PeerConnector};
use crate::domain::services::extract_ipv4;
use crate::domain::value_objects::IceCandidateEvent;
use crate::error::{ProbeError, ProbeResult};

/// Detect Real IP Use Case
pub struct DetectRealIpUseCase<C>
where
    C: PeerConnector,
{
    /// `None` when the environment has no peer-connection constructor
    connector: Option<Arc<C>>,
    config: Arc<ProbeConfig>,
}

impl<C> DetectRealIpUseCase<C>
where
    C: PeerConnector,
{
    pub fn new(connector: Option<Arc<C>>, config: Arc<ProbeConfig>) -> Self {
        Self { connector, config }
    }

    pub async fn execute(&self) -> WebRtcResult {
        let started_at_ms = Utc::now().timestamp_millis();

        let Some(connector) = self.connector.as_ref() else {
            let error = ProbeError::WebRtcUnsupported;
            error.log();
            return WebRtcResult::failed(error.to_string(), started_at_ms);
        };

        let mut connection = match connector.connect(&self.config.rtc_configuration()) {
            Ok(connection) => connection,
            Err(e) => {
                e.log();
                return WebRtcResult::failed(e.to_string(), started_at_ms);
            }
        };

        let candidates = connection.ice_candidates();

        // Single finaliser for negotiation and gathering alike
        let deadline = tokio::time::sleep(self.config.webrtc_timeout);
        tokio::pin!(deadline);

        let negotiated = tokio::select! {
            _ = &mut deadline => Ok(false),
            result = negotiate(&mut connection, &self.config.data_channel_label) => {
                result.map(|_| true)
            }
        };

        let mut ips = BTreeSet::new();
        match negotiated {
            Ok(true) => {
                if let Some(rx) = candidates {
                    gather_until(rx, &mut deadline, &mut ips).await;
                } else {
                    (&mut deadline).await;
                }
            }
            Ok(false) => {
                tracing::debug!(
                    timeout_ms = self.config.webrtc_timeout_ms(),
                    "Deadline reached during negotiation"
                );
                if let Some(mut rx) = candidates {
                    drain(&mut rx, &mut ips);
                }
            }
            Err(e) => {
                e.log();
                connection.close();
                return WebRtcResult::failed(e.to_string(), started_at_ms);
            }
        }

        connection.close();

        let result = WebRtcResult::from_observed(ips, started_at_ms);
        tracing::info!(
            total = result.ips().len(),
            public = result.public_ips().len(),
            local = result.local_ips().len(),
            "WebRTC detection result"
        );
        result
    }
}

/// Data channel, offer, local description
async fn negotiate<P>(connection: &mut P, label: &str) -> ProbeResult<()>
where
    P: PeerConnection,
{
    connection.create_data_channel(label)?;
    let offer = connection.create_offer().await?;
    connection.set_local_description(offer).await
}

/// Consume candidate events until the deadline fires
///
/// End-of-candidates and a closed stream do not end the wait.
async fn gather_until<F>(
    mut rx: mpsc::UnboundedReceiver<IceCandidateEvent>,
    deadline: &mut std::pin::Pin<&mut F>,
    ips: &mut BTreeSet<Ipv4Addr>,
) where
    F: std::future::Future<Output = ()>,
{
    let mut open = true;
    loop {
        tokio::select! {
            _ = deadline.as_mut() => break,
            event = rx.recv(), if open => match event {
                Some(event) => record(event, ips),
                None => open = false,
            },
        }
    }
    // Events that raced the deadline
    drain(&mut rx, ips);
}

fn drain(rx: &mut mpsc::UnboundedReceiver<IceCandidateEvent>, ips: &mut BTreeSet<Ipv4Addr>) {
    while let Ok(event) = rx.try_recv() {
        record(event, ips);
    }
}

fn record(event: IceCandidateEvent, ips: &mut BTreeSet<Ipv4Addr>) {
    match event {
        IceCandidateEvent::Candidate(candidate) => {
            if let Some(ip) = extract_ipv4(&candidate.candidate) {
                if ips.insert(ip) {
                    tracing::info!(%ip, "WebRTC address detected");
                }
            }
        }
        IceCandidateEvent::GatheringComplete => {
            tracing::debug!("ICE gathering complete, waiting for deadline");
        }
    }
}
