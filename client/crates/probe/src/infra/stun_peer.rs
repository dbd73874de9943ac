//! STUN Peer Connection
//!
//! Native stand-in for `RTCPeerConnection`. It performs only the part of
//! ICE that leaks addresses: one UDP socket per STUN server, a `host`
//! candidate for the socket's route-local address and a `srflx` candidate
//! for the address the server saw.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use platform::crypto::{random_bytes, random_token, sha256};
use platform::stun::{StunError, TransactionId, decode_binding_response, encode_binding_request};
use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::domain::ports::{PeerConnection, PeerConnector};
use crate::domain::value_objects::{
    IceCandidate, IceCandidateEvent, RtcConfiguration, SdpType, SessionDescription,
};
use crate::error::{ProbeError, ProbeResult};

const DEFAULT_STUN_PORT: u16 = 3478;
const RECV_BUFFER_LEN: usize = 1024;

/// RFC 8445 type preferences
const HOST_TYPE_PREFERENCE: u32 = 126;
const SRFLX_TYPE_PREFERENCE: u32 = 100;
const LOCAL_PREFERENCE: u32 = 65535;
const COMPONENT_RTP: u32 = 1;

/// `stun:host[:port]` server address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunServer {
    pub host: String,
    pub port: u16,
}

impl StunServer {
    /// Parse a `stun:` ICE server URL; TURN and TLS variants are rejected
    pub fn parse(url: &str) -> ProbeResult<Self> {
        let invalid = || ProbeError::InvalidIceServer(url.to_string());

        let rest = url.trim().strip_prefix("stun:").ok_or_else(invalid)?;
        let rest = rest.split('?').next().unwrap_or_default();

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
            None => (rest, DEFAULT_STUN_PORT),
        };

        if host.is_empty() || host.contains(['/', '[', ']', ':']) || port == 0 {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for StunServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Builds [`StunPeerConnection`]s
#[derive(Debug, Clone)]
pub struct StunPeerConnector {
    response_timeout: Duration,
}

impl StunPeerConnector {
    pub fn new(response_timeout: Duration) -> Self {
        Self { response_timeout }
    }
}

impl PeerConnector for StunPeerConnector {
    type Connection = StunPeerConnection;

    fn connect(&self, configuration: &RtcConfiguration) -> ProbeResult<StunPeerConnection> {
        let servers = configuration
            .ice_servers
            .iter()
            .map(|server| StunServer::parse(&server.urls))
            .collect::<ProbeResult<Vec<_>>>()?;

        Ok(StunPeerConnection::new(servers, self.response_timeout))
    }
}

/// One native peer connection
///
/// Gathering starts on `set_local_description` and stops on `close` or drop.
pub struct StunPeerConnection {
    servers: Vec<StunServer>,
    response_timeout: Duration,
    data_channels: Vec<String>,
    events: mpsc::UnboundedSender<IceCandidateEvent>,
    candidates: Option<mpsc::UnboundedReceiver<IceCandidateEvent>>,
    local_description: Option<SessionDescription>,
    gathering: Option<JoinHandle<()>>,
    closed: bool,
}

impl StunPeerConnection {
    pub fn new(servers: Vec<StunServer>, response_timeout: Duration) -> Self {
        let (events, candidates) = mpsc::unbounded_channel();
        Self {
            servers,
            response_timeout,
            data_channels: Vec::new(),
            events,
            candidates: Some(candidates),
            local_description: None,
            gathering: None,
            closed: false,
        }
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.closed {
            return Err(ProbeError::ConnectionClosed);
        }
        Ok(())
    }

    fn build_offer(&self) -> String {
        let mut session_id = [0u8; 8];
        session_id.copy_from_slice(&random_bytes(8));
        // Session ids stay within 63 bits
        let session_id = u64::from_be_bytes(session_id) >> 1;

        let mut lines = vec![
            "v=0".to_string(),
            format!("o=- {} 2 IN IP4 127.0.0.1", session_id),
            "s=-".to_string(),
            "t=0 0".to_string(),
        ];

        if !self.data_channels.is_empty() {
            lines.extend([
                "a=group:BUNDLE 0".to_string(),
                "m=application 9 UDP/DTLS/SCTP webrtc-datachannel".to_string(),
                "c=IN IP4 0.0.0.0".to_string(),
                format!("a=ice-ufrag:{}", random_token(3)),
                format!("a=ice-pwd:{}", random_token(18)),
                "a=ice-options:trickle".to_string(),
                "a=setup:actpass".to_string(),
                "a=mid:0".to_string(),
                "a=sctp-port:5000".to_string(),
                "a=max-message-size:262144".to_string(),
            ]);
        }

        let mut sdp = lines.join("\r\n");
        sdp.push_str("\r\n");
        sdp
    }

    fn start_gathering(&mut self) {
        if self.gathering.is_some() {
            return;
        }
        if self.data_channels.is_empty() {
            tracing::debug!("Offer has no media section, nothing to gather");
            return;
        }

        let servers = self.servers.clone();
        let events = self.events.clone();
        let response_timeout = self.response_timeout;
        self.gathering = Some(tokio::spawn(gather(servers, response_timeout, events)));
    }
}

impl PeerConnection for StunPeerConnection {
    fn ice_candidates(&mut self) -> Option<mpsc::UnboundedReceiver<IceCandidateEvent>> {
        self.candidates.take()
    }

    fn create_data_channel(&mut self, label: &str) -> ProbeResult<()> {
        self.ensure_open()?;
        self.data_channels.push(label.to_string());
        Ok(())
    }

    async fn create_offer(&mut self) -> ProbeResult<SessionDescription> {
        self.ensure_open()?;
        Ok(SessionDescription {
            sdp_type: SdpType::Offer,
            sdp: self.build_offer(),
        })
    }

    async fn set_local_description(&mut self, description: SessionDescription) -> ProbeResult<()> {
        self.ensure_open()?;
        if description.sdp_type != SdpType::Offer {
            return Err(ProbeError::Negotiation(
                "local description must be an offer".to_string(),
            ));
        }

        self.local_description = Some(description);
        self.start_gathering();
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(gathering) = self.gathering.take() {
            gathering.abort();
        }
        tracing::debug!("Peer connection closed");
    }
}

impl Drop for StunPeerConnection {
    fn drop(&mut self) {
        if let Some(gathering) = self.gathering.take() {
            gathering.abort();
        }
    }
}

/// Query every server concurrently, then signal end-of-candidates
async fn gather(
    servers: Vec<StunServer>,
    response_timeout: Duration,
    events: mpsc::UnboundedSender<IceCandidateEvent>,
) {
    let mut tasks = JoinSet::new();
    for server in servers {
        let events = events.clone();
        tasks.spawn(async move {
            if let Err(e) = gather_from(&server, response_timeout, &events).await {
                tracing::debug!(server = %server, error = %e, "STUN gathering failed");
            }
        });
    }
    while tasks.join_next().await.is_some() {}

    // Receiver may already be gone once the deadline fired
    let _ = events.send(IceCandidateEvent::GatheringComplete);
}

async fn gather_from(
    server: &StunServer,
    response_timeout: Duration,
    events: &mpsc::UnboundedSender<IceCandidateEvent>,
) -> ProbeResult<()> {
    let target = lookup_host((server.host.as_str(), server.port))
        .await?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ProbeError::Unresolvable(server.to_string()))?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(target).await?;
    let base = socket.local_addr()?;

    emit(events, host_candidate(base));

    let transaction_id = TransactionId::random();
    socket.send(&encode_binding_request(&transaction_id)).await?;

    let mapped = tokio::time::timeout(response_timeout, read_mapped(&socket, &transaction_id))
        .await
        .map_err(|_| ProbeError::StunTimeout(server.to_string()))??;

    tracing::debug!(server = %server, mapped = %mapped, "STUN binding answered");
    emit(events, srflx_candidate(mapped, base, server));
    Ok(())
}

/// Read until the answer to `transaction_id` arrives
async fn read_mapped(socket: &UdpSocket, transaction_id: &TransactionId) -> ProbeResult<SocketAddr> {
    let mut buf = [0u8; RECV_BUFFER_LEN];
    loop {
        let len = socket.recv(&mut buf).await?;
        match decode_binding_response(&buf[..len], transaction_id) {
            Ok(mapped) => return Ok(mapped),
            Err(StunError::TransactionMismatch) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn emit(events: &mpsc::UnboundedSender<IceCandidateEvent>, candidate: String) {
    let _ = events.send(IceCandidateEvent::Candidate(IceCandidate::new(candidate)));
}

fn host_candidate(base: SocketAddr) -> String {
    format!(
        "candidate:{} {} udp {} {} {} typ host",
        foundation(&["host", &base.ip().to_string()]),
        COMPONENT_RTP,
        priority(HOST_TYPE_PREFERENCE),
        base.ip(),
        base.port()
    )
}

fn srflx_candidate(mapped: SocketAddr, base: SocketAddr, server: &StunServer) -> String {
    format!(
        "candidate:{} {} udp {} {} {} typ srflx raddr {} rport {}",
        foundation(&["srflx", &base.ip().to_string(), &server.to_string()]),
        COMPONENT_RTP,
        priority(SRFLX_TYPE_PREFERENCE),
        mapped.ip(),
        mapped.port(),
        base.ip(),
        base.port()
    )
}

/// RFC 8445 §5.1.2.1
fn priority(type_preference: u32) -> u32 {
    (type_preference << 24) + (LOCAL_PREFERENCE << 8) + (256 - COMPONENT_RTP)
}

/// Stable per type and base address, like a browser's foundation
fn foundation(parts: &[&str]) -> u32 {
    let digest = sha256(parts.join("|").as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
