//! Scenario tests for the probe crate
//! Deterministic timers via paused tokio time

#[cfg(test)]
mod support {
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::sync::{mpsc, oneshot};
    use tokio::task::JoinHandle;

    use crate::domain::entities::ClientFingerprint;
    use crate::domain::ports::{
        AudioContext, BrowserEnvironment, Canvas2d, FingerprintReporter, PeerConnection,
        PeerConnector, WebGlContext,
    };
    use crate::domain::value_objects::{
        AudioGraph, BrowserInfo, IceCandidate, IceCandidateEvent, RtcConfiguration, ScreenInfo,
        SdpType, SessionDescription, TimezoneInfo, VerifyOutcome, WebGlParameter,
    };
    use crate::error::{ProbeError, ProbeResult};

    pub fn candidate(line: &str) -> IceCandidateEvent {
        IceCandidateEvent::Candidate(IceCandidate::new(line))
    }

    pub fn host(ip: &str) -> IceCandidateEvent {
        candidate(&format!("candidate:1 1 udp 2122260223 {} 54321 typ host", ip))
    }

    pub fn srflx(ip: &str, base: &str) -> IceCandidateEvent {
        candidate(&format!(
            "candidate:2 1 udp 1686052607 {} 61000 typ srflx raddr {} rport 54321",
            ip, base
        ))
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Offer {
        Succeed,
        Fail,
        Hang,
    }

    /// Scripted peer connection factory
    pub struct MockConnector {
        /// `(milliseconds after set_local_description, event)`
        events: Vec<(u64, IceCandidateEvent)>,
        offer: Offer,
        pub calls: Arc<Mutex<Vec<String>>>,
        pub closed: Arc<AtomicBool>,
    }

    impl MockConnector {
        pub fn new(events: Vec<(u64, IceCandidateEvent)>) -> Self {
            Self {
                events,
                offer: Offer::Succeed,
                calls: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn with_offer(mut self, offer: Offer) -> Self {
            self.offer = offer;
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn was_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    impl PeerConnector for MockConnector {
        type Connection = MockConnection;

        fn connect(&self, configuration: &RtcConfiguration) -> ProbeResult<MockConnection> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("connect:{}", configuration.ice_servers.len()));

            let (tx, rx) = mpsc::unbounded_channel();
            Ok(MockConnection {
                events: self.events.clone(),
                offer: self.offer,
                tx: Some(tx),
                rx: Some(rx),
                feeder: None,
                calls: self.calls.clone(),
                closed: self.closed.clone(),
            })
        }
    }

    pub struct MockConnection {
        events: Vec<(u64, IceCandidateEvent)>,
        offer: Offer,
        tx: Option<mpsc::UnboundedSender<IceCandidateEvent>>,
        rx: Option<mpsc::UnboundedReceiver<IceCandidateEvent>>,
        feeder: Option<JoinHandle<()>>,
        calls: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockConnection {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    impl PeerConnection for MockConnection {
        fn ice_candidates(&mut self) -> Option<mpsc::UnboundedReceiver<IceCandidateEvent>> {
            self.rx.take()
        }

        fn create_data_channel(&mut self, label: &str) -> ProbeResult<()> {
            self.record(format!("data_channel:{}", label));
            Ok(())
        }

        async fn create_offer(&mut self) -> ProbeResult<SessionDescription> {
            self.record("create_offer");
            match self.offer {
                Offer::Succeed => Ok(SessionDescription {
                    sdp_type: SdpType::Offer,
                    sdp: "v=0\r\n".to_string(),
                }),
                Offer::Fail => Err(ProbeError::Negotiation("offer rejected".to_string())),
                Offer::Hang => std::future::pending().await,
            }
        }

        async fn set_local_description(
            &mut self,
            description: SessionDescription,
        ) -> ProbeResult<()> {
            assert_eq!(description.sdp_type, SdpType::Offer);
            self.record("set_local_description");

            let Some(tx) = self.tx.take() else {
                return Ok(());
            };
            let events = self.events.clone();
            self.feeder = Some(tokio::spawn(async move {
                let start = tokio::time::Instant::now();
                for (at_ms, event) in events {
                    tokio::time::sleep_until(start + Duration::from_millis(at_ms)).await;
                    let _ = tx.send(event);
                }
                // Sender dropped here: the stream closes
            }));
            Ok(())
        }

        fn close(&mut self) {
            self.record("close");
            self.closed.store(true, Ordering::SeqCst);
            if let Some(feeder) = self.feeder.take() {
                feeder.abort();
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Capability {
        Absent,
        Broken,
        Working,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum AudioMode {
        Absent,
        Broken,
        /// First buffer arrives right away
        Deliver,
        /// Processor never fires
        Silent,
        /// Processor goes away without a buffer
        Dropped,
    }

    pub const FAKE_DATA_URL_PAYLOAD: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAMgAAAAyCAYAAAAZUZThAAAQAElEQVR4AeydB5gURRbHq3t2l4wBBRMGxHSKd4KnHoJH";

    pub struct FakeEnvironment {
        pub canvas: Capability,
        pub webgl: Capability,
        pub webgl_debug_extension: bool,
        pub audio: AudioMode,
        pub canvas_ops: Arc<Mutex<Vec<String>>>,
    }

    impl FakeEnvironment {
        pub fn headless() -> Self {
            Self {
                canvas: Capability::Absent,
                webgl: Capability::Absent,
                webgl_debug_extension: false,
                audio: AudioMode::Absent,
                canvas_ops: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn full() -> Self {
            Self {
                canvas: Capability::Working,
                webgl: Capability::Working,
                webgl_debug_extension: true,
                audio: AudioMode::Deliver,
                canvas_ops: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl BrowserEnvironment for FakeEnvironment {
        type Canvas = FakeCanvas;
        type WebGl = FakeWebGl;
        type Audio = FakeAudio;

        fn browser(&self) -> BrowserInfo {
            BrowserInfo {
                user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
                language: "es-ES".into(),
                languages: vec!["es-ES".into(), "es".into()],
                platform: "Linux x86_64".into(),
                cookie_enabled: true,
                on_line: true,
                hardware_concurrency: 8,
            }
        }

        fn screen(&self) -> ScreenInfo {
            ScreenInfo {
                width: 1920,
                height: 1080,
                color_depth: 24,
                pixel_depth: 24,
                avail_width: 1920,
                avail_height: 1040,
            }
        }

        fn timezone(&self) -> TimezoneInfo {
            TimezoneInfo {
                offset: 360,
                zone: "America/Mexico_City".into(),
            }
        }

        fn create_canvas(&self) -> ProbeResult<Option<FakeCanvas>> {
            match self.canvas {
                Capability::Absent => Ok(None),
                Capability::Broken => Err(ProbeError::Surface("2d context lost".into())),
                Capability::Working => Ok(Some(FakeCanvas {
                    ops: self.canvas_ops.clone(),
                })),
            }
        }

        fn create_webgl_context(&self) -> ProbeResult<Option<FakeWebGl>> {
            match self.webgl {
                Capability::Absent => Ok(None),
                Capability::Broken => Err(ProbeError::Surface("webgl context lost".into())),
                Capability::Working => Ok(Some(FakeWebGl {
                    debug_extension: self.webgl_debug_extension,
                })),
            }
        }

        fn create_audio_context(&self) -> ProbeResult<Option<FakeAudio>> {
            match self.audio {
                AudioMode::Absent => Ok(None),
                AudioMode::Broken => Err(ProbeError::Surface("audio device busy".into())),
                mode => Ok(Some(FakeAudio {
                    mode,
                    _pending: None,
                })),
            }
        }
    }

    pub struct FakeCanvas {
        ops: Arc<Mutex<Vec<String>>>,
    }

    impl FakeCanvas {
        fn op(&self, op: String) {
            self.ops.lock().unwrap().push(op);
        }
    }

    impl Canvas2d for FakeCanvas {
        fn resize(&mut self, width: u32, height: u32) {
            self.op(format!("resize {}x{}", width, height));
        }

        fn set_text_baseline(&mut self, baseline: &str) {
            self.op(format!("textBaseline {}", baseline));
        }

        fn set_font(&mut self, font: &str) {
            self.op(format!("font {}", font));
        }

        fn set_fill_style(&mut self, style: &str) {
            self.op(format!("fillStyle {}", style));
        }

        fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
            self.op(format!("fillRect {} {} {} {}", x, y, width, height));
        }

        fn fill_text(&mut self, text: &str, x: f64, y: f64) -> ProbeResult<()> {
            self.op(format!("fillText {} {} {}", text, x, y));
            Ok(())
        }

        fn to_data_url(&self) -> ProbeResult<String> {
            Ok(format!("data:image/png;base64,{}", FAKE_DATA_URL_PAYLOAD))
        }
    }

    pub struct FakeWebGl {
        debug_extension: bool,
    }

    impl WebGlContext for FakeWebGl {
        fn has_extension(&self, name: &str) -> bool {
            self.debug_extension && name == "WEBGL_debug_renderer_info"
        }

        fn parameter(&self, parameter: WebGlParameter) -> ProbeResult<String> {
            Ok(match parameter {
                WebGlParameter::UnmaskedVendor => "Google Inc. (Intel)".into(),
                WebGlParameter::UnmaskedRenderer => {
                    "ANGLE (Intel, Mesa Intel(R) UHD Graphics 620 (KBL GT2), OpenGL 4.6)".into()
                }
            })
        }
    }

    pub struct FakeAudio {
        mode: AudioMode,
        /// Keeps the buffer channel open without ever sending
        _pending: Option<oneshot::Sender<Vec<f32>>>,
    }

    impl AudioContext for FakeAudio {
        fn start(&mut self, graph: &AudioGraph) -> ProbeResult<oneshot::Receiver<Vec<f32>>> {
            assert_eq!(*graph, AudioGraph::FINGERPRINT);
            let (tx, rx) = oneshot::channel();
            match self.mode {
                AudioMode::Deliver => {
                    let _ = tx.send(vec![0.5, -0.5, 0.25, -0.25]);
                }
                AudioMode::Silent => self._pending = Some(tx),
                _ => drop(tx),
            }
            Ok(rx)
        }

        fn stop(&mut self) -> ProbeResult<()> {
            // Teardown failures must not leak out of the sub-probe
            Err(ProbeError::Surface("already stopped".into()))
        }

        fn close(&mut self) -> ProbeResult<()> {
            Err(ProbeError::Surface("already closed".into()))
        }
    }

    #[derive(Debug, Clone)]
    pub enum Reply {
        Ok,
        Verdict { success: bool, message: Option<String> },
        Status(u16, Option<String>),
    }

    impl Reply {
        fn error(&self) -> Option<ProbeError> {
            match self {
                Reply::Status(status, message) => Some(ProbeError::Rejected {
                    status: *status,
                    message: message.clone(),
                }),
                _ => None,
            }
        }
    }

    pub struct FakeReporter {
        submit: Reply,
        verify: Reply,
        pub submitted: Mutex<Vec<ClientFingerprint>>,
        pub verified: Mutex<Vec<Vec<Ipv4Addr>>>,
    }

    impl FakeReporter {
        pub fn new(submit: Reply, verify: Reply) -> Self {
            Self {
                submit,
                verify,
                submitted: Mutex::new(Vec::new()),
                verified: Mutex::new(Vec::new()),
            }
        }
    }

    impl FingerprintReporter for FakeReporter {
        async fn submit(&self, fingerprint: &ClientFingerprint) -> ProbeResult<()> {
            self.submitted.lock().unwrap().push(fingerprint.clone());
            match self.submit.error() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn verify(&self, public_ips: &[Ipv4Addr]) -> ProbeResult<VerifyOutcome> {
            self.verified.lock().unwrap().push(public_ips.to_vec());
            if let Some(e) = self.verify.error() {
                return Err(e);
            }
            Ok(match &self.verify {
                Reply::Verdict { success, message } => VerifyOutcome {
                    success: *success,
                    message: message.clone(),
                },
                _ => VerifyOutcome {
                    success: true,
                    message: None,
                },
            })
        }
    }
}

#[cfg(test)]
mod detect_real_ip_tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::Instant;

    use super::support::*;
    use crate::application::config::ProbeConfig;
    use crate::application::detect_real_ip::DetectRealIpUseCase;
    use crate::domain::value_objects::IceCandidateEvent;
    use crate::infra::stun_peer::StunPeerConnector;

    fn use_case(connector: &Arc<MockConnector>) -> DetectRealIpUseCase<MockConnector> {
        DetectRealIpUseCase::new(Some(connector.clone()), Arc::new(ProbeConfig::default()))
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_environment() {
        let use_case: DetectRealIpUseCase<MockConnector> =
            DetectRealIpUseCase::new(None, Arc::new(ProbeConfig::default()));

        let start = Instant::now();
        let result = use_case.execute().await;

        assert!(!result.success());
        assert!(result.ips().is_empty());
        assert!(result.local_ips().is_empty());
        assert!(result.public_ips().is_empty());
        assert_eq!(result.error(), Some("WebRTC not supported"));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_private_host_candidate() {
        let connector = Arc::new(MockConnector::new(vec![
            (10, host("192.168.1.5")),
            (20, IceCandidateEvent::GatheringComplete),
        ]));

        let start = Instant::now();
        let result = use_case(&connector).execute().await;
        let elapsed = start.elapsed();

        assert!(result.success());
        assert_eq!(result.ips().iter().copied().collect::<Vec<_>>(), vec![ip("192.168.1.5")]);
        assert_eq!(result.local_ips(), result.ips());
        assert!(result.public_ips().is_empty());
        assert!(result.error().is_none());

        // End-of-candidates does not short-circuit the deadline
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negotiation_sequence_and_close() {
        let connector = Arc::new(MockConnector::new(vec![(5, host("10.0.0.5"))]));
        use_case(&connector).execute().await;

        assert_eq!(
            connector.calls(),
            vec![
                "connect:5",
                "data_channel:ip-detection",
                "create_offer",
                "set_local_description",
                "close",
            ]
        );
        assert!(connector.was_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_candidates_are_partitioned() {
        let connector = Arc::new(MockConnector::new(vec![
            (5, host("192.168.1.5")),
            (6, candidate("candidate:3 1 udp 2122260223 0f2c5a1e-3b7d-4c1a-9e2f.local 50000 typ host")),
            (40, srflx("203.0.113.7", "192.168.1.5")),
            (41, srflx("203.0.113.7", "192.168.1.5")),
            (60, candidate("candidate:4 1 udp 2122262783 2001:db8::1 50001 typ host")),
            (80, host("169.254.3.4")),
            (90, IceCandidateEvent::GatheringComplete),
        ]));

        let result = use_case(&connector).execute().await;

        assert!(result.success());
        assert_eq!(result.ips().len(), 3);
        assert_eq!(
            result.local_ips().iter().copied().collect::<Vec<_>>(),
            vec![ip("169.254.3.4"), ip("192.168.1.5")]
        );
        assert_eq!(
            result.public_ips().iter().copied().collect::<Vec<_>>(),
            vec![ip("203.0.113.7")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_candidates_after_deadline_are_ignored() {
        let connector = Arc::new(MockConnector::new(vec![
            (100, host("10.0.0.5")),
            (5000, srflx("198.51.100.9", "10.0.0.5")),
        ]));

        let result = use_case(&connector).execute().await;

        assert_eq!(result.ips().iter().copied().collect::<Vec<_>>(), vec![ip("10.0.0.5")]);
        assert!(result.public_ips().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_candidates_resolves_at_deadline() {
        let connector = Arc::new(MockConnector::new(Vec::new()));

        let start = Instant::now();
        let result = use_case(&connector).execute().await;

        assert!(!result.success());
        assert!(result.ips().is_empty());
        assert!(result.error().is_none());
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offer_failure_resolves_with_error() {
        let connector = Arc::new(MockConnector::new(vec![(5, host("10.0.0.5"))]).with_offer(Offer::Fail));

        let start = Instant::now();
        let result = use_case(&connector).execute().await;

        assert!(!result.success());
        assert!(result.ips().is_empty());
        assert_eq!(result.error(), Some("Negotiation failed: offer rejected"));
        assert!(connector.was_closed());
        assert!(start.elapsed() < Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_negotiation_is_bounded() {
        let connector = Arc::new(MockConnector::new(Vec::new()).with_offer(Offer::Hang));

        let start = Instant::now();
        let result = use_case(&connector).execute().await;

        assert!(!result.success());
        assert!(result.error().is_none());
        assert!(connector.was_closed());
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_timeout() {
        let connector = Arc::new(MockConnector::new(vec![(400, host("10.0.0.5"))]));
        let mut config = ProbeConfig::default();
        config.webrtc_timeout = Duration::from_millis(250);
        let use_case = DetectRealIpUseCase::new(Some(connector), Arc::new(config));

        let start = Instant::now();
        let result = use_case.execute().await;

        assert!(result.ips().is_empty());
        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_invalid_ice_server_resolves_with_error() {
        let config = ProbeConfig::default().with_stun_servers(["turn:turn.example.org:3478"]);
        let connector = Arc::new(StunPeerConnector::new(config.effective_stun_timeout()));
        let use_case = DetectRealIpUseCase::new(Some(connector), Arc::new(config));

        let result = use_case.execute().await;

        assert!(!result.success());
        assert!(result.ips().is_empty());
        assert!(result.error().unwrap().contains("turn:turn.example.org:3478"));
    }
}

#[cfg(test)]
mod fingerprint_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::Instant;

    use super::support::*;
    use crate::application::collect_fingerprint::CollectFingerprintUseCase;
    use crate::application::config::ProbeConfig;
    use crate::application::surfaces::{audio_fingerprint, canvas_fingerprint, webgl_fingerprint};
    use crate::domain::services::canvas_digest;
    use crate::domain::value_objects::{IceCandidateEvent, SurfaceKind, SurfaceOutcome};
    use crate::presentation::dto::FingerprintPayload;

    const AUDIO_TIMEOUT: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn test_all_sentinel_fingerprint() {
        let use_case: CollectFingerprintUseCase<MockConnector, FakeEnvironment> =
            CollectFingerprintUseCase::new(
                None,
                Arc::new(FakeEnvironment::headless()),
                Arc::new(ProbeConfig::default()),
            );

        let fingerprint = use_case.execute().await;

        assert!(!fingerprint.webrtc.success());
        assert_eq!(fingerprint.webrtc.error(), Some("WebRTC not supported"));
        assert_eq!(fingerprint.canvas.wire_value(), "no-canvas");
        assert_eq!(fingerprint.webgl.wire_value(), "no-webgl");
        assert_eq!(fingerprint.audio.wire_value(), "no-audio");
        assert_eq!(fingerprint.browser.language, "es-ES");
        assert_eq!(fingerprint.screen.width, 1920);
        assert_eq!(fingerprint.timezone.offset, 360);
        assert!(fingerprint.timestamp >= fingerprint.webrtc.timestamp());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_fingerprint() {
        let connector = Arc::new(MockConnector::new(vec![
            (5, host("192.168.1.5")),
            (30, srflx("203.0.113.7", "192.168.1.5")),
            (31, IceCandidateEvent::GatheringComplete),
        ]));
        let use_case = CollectFingerprintUseCase::new(
            Some(connector),
            Arc::new(FakeEnvironment::full()),
            Arc::new(ProbeConfig::default()),
        );

        let fingerprint = use_case.execute().await;

        assert_eq!(fingerprint.webrtc.public_ips().len(), 1);
        assert_eq!(fingerprint.webrtc.local_ips().len(), 1);
        assert_eq!(
            fingerprint.canvas.hash(),
            Some(canvas_digest(&format!("data:image/png;base64,{}", FAKE_DATA_URL_PAYLOAD)).as_str())
        );
        assert_eq!(fingerprint.webgl.hash().map(|h| h.chars().count()), Some(50));
        assert_eq!(fingerprint.audio.hash(), Some("1.i"));

        let payload = serde_json::to_value(FingerprintPayload::from(&fingerprint)).unwrap();
        assert_eq!(payload["webrtc"]["publicIPs"][0], "203.0.113.7");
        assert_eq!(payload["audio"], "1.i");
    }

    #[test]
    fn test_canvas_draws_fixed_pattern() {
        let env = FakeEnvironment::full();
        let fp = canvas_fingerprint(&env);

        assert_eq!(fp.kind, SurfaceKind::Canvas);
        assert_eq!(fp.hash().map(str::len), Some(60));
        assert_eq!(
            *env.canvas_ops.lock().unwrap(),
            vec![
                "resize 200x50",
                "textBaseline top",
                "font 14px Arial",
                "fillStyle #f60",
                "fillRect 125 1 62 20",
                "fillStyle #069",
                "fillText TuSecreto 🤫 2 15",
                "fillStyle rgba(102, 204, 0, 0.7)",
                "fillText Fingerprint Test 4 30",
            ]
        );
    }

    #[test]
    fn test_canvas_failure_is_tagged() {
        let mut env = FakeEnvironment::full();
        env.canvas = Capability::Broken;
        let fp = canvas_fingerprint(&env);
        assert!(matches!(fp.outcome, SurfaceOutcome::Failed(_)));
        assert_eq!(fp.wire_value(), "canvas-error");
    }

    #[test]
    fn test_webgl_outcomes() {
        let mut env = FakeEnvironment::full();
        assert_eq!(
            webgl_fingerprint(&env).hash(),
            Some("Google Inc. (Intel)|ANGLE (Intel, Mesa Intel(R) UH")
        );

        env.webgl_debug_extension = false;
        assert_eq!(webgl_fingerprint(&env).wire_value(), "webgl-limited");

        env.webgl = Capability::Broken;
        assert_eq!(webgl_fingerprint(&env).wire_value(), "webgl-error");

        env.webgl = Capability::Absent;
        assert_eq!(webgl_fingerprint(&env).wire_value(), "no-webgl");
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_digest_and_swallowed_teardown() {
        let env = FakeEnvironment::full();
        let fp = audio_fingerprint(&env, AUDIO_TIMEOUT).await;
        assert_eq!(fp.outcome, SurfaceOutcome::Hash("1.i".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_timeout() {
        let mut env = FakeEnvironment::full();
        env.audio = AudioMode::Silent;

        let start = Instant::now();
        let fp = audio_fingerprint(&env, AUDIO_TIMEOUT).await;

        assert_eq!(fp.outcome, SurfaceOutcome::TimedOut);
        assert_eq!(fp.wire_value(), "audio-timeout");
        assert_eq!(start.elapsed(), AUDIO_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_dropped_processor_waits_for_deadline() {
        let mut env = FakeEnvironment::full();
        env.audio = AudioMode::Dropped;

        let start = Instant::now();
        let fp = audio_fingerprint(&env, AUDIO_TIMEOUT).await;

        assert_eq!(fp.wire_value(), "audio-timeout");
        assert_eq!(start.elapsed(), AUDIO_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_construction_failure() {
        let mut env = FakeEnvironment::full();
        env.audio = AudioMode::Broken;
        let fp = audio_fingerprint(&env, AUDIO_TIMEOUT).await;
        assert_eq!(fp.wire_value(), "audio-error");
    }
}

#[cfg(test)]
mod check_connection_tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use super::support::*;
    use crate::application::check_connection::{CheckConnectionUseCase, DEFAULT_BLOCK_REASON};
    use crate::application::collect_fingerprint::CollectFingerprintUseCase;
    use crate::application::config::ProbeConfig;
    use crate::domain::entities::ConnectionVerdict;
    use crate::domain::value_objects::IceCandidateEvent;

    fn leaking_connector() -> Arc<MockConnector> {
        Arc::new(MockConnector::new(vec![
            (5, host("192.168.1.5")),
            (30, srflx("203.0.113.7", "192.168.1.5")),
            (31, IceCandidateEvent::GatheringComplete),
        ]))
    }

    fn private_connector() -> Arc<MockConnector> {
        Arc::new(MockConnector::new(vec![(5, host("192.168.1.5"))]))
    }

    async fn run(
        connector: Arc<MockConnector>,
        reporter: &Arc<FakeReporter>,
    ) -> ConnectionVerdict {
        let collect = CollectFingerprintUseCase::new(
            Some(connector),
            Arc::new(FakeEnvironment::headless()),
            Arc::new(ProbeConfig::default()),
        );
        let use_case = CheckConnectionUseCase::new(collect, reporter.clone());
        let output = use_case.execute().await;

        assert_eq!(reporter.submitted.lock().unwrap().len(), 1);
        assert_eq!(reporter.submitted.lock().unwrap()[0], output.fingerprint);
        output.verdict
    }

    #[tokio::test(start_paused = true)]
    async fn test_private_only_skips_verification() {
        let reporter = Arc::new(FakeReporter::new(Reply::Ok, Reply::Ok));
        let verdict = run(private_connector(), &reporter).await;

        assert_eq!(verdict, ConnectionVerdict::Clear);
        assert!(reporter.verified.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_public_address_verified_clear() {
        let reporter = Arc::new(FakeReporter::new(
            Reply::Ok,
            Reply::Verdict {
                success: true,
                message: None,
            },
        ));
        let verdict = run(leaking_connector(), &reporter).await;

        assert_eq!(verdict, ConnectionVerdict::Clear);
        assert_eq!(
            *reporter.verified.lock().unwrap(),
            vec![vec![Ipv4Addr::new(203, 0, 113, 7)]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_failure_blocks() {
        let reporter = Arc::new(FakeReporter::new(
            Reply::Ok,
            Reply::Verdict {
                success: false,
                message: Some("VPN detectado".into()),
            },
        ));
        let verdict = run(leaking_connector(), &reporter).await;
        assert_eq!(
            verdict,
            ConnectionVerdict::Blocked {
                reason: "VPN detectado".into()
            }
        );

        let reporter = Arc::new(FakeReporter::new(
            Reply::Ok,
            Reply::Verdict {
                success: false,
                message: None,
            },
        ));
        let verdict = run(leaking_connector(), &reporter).await;
        assert_eq!(
            verdict,
            ConnectionVerdict::Blocked {
                reason: DEFAULT_BLOCK_REASON.into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_blocks() {
        let reporter = Arc::new(FakeReporter::new(Reply::Ok, Reply::Status(403, None)));
        let verdict = run(leaking_connector(), &reporter).await;
        assert_eq!(
            verdict,
            ConnectionVerdict::Blocked {
                reason: "VPN/Proxy detected".into()
            }
        );

        let reporter = Arc::new(FakeReporter::new(
            Reply::Status(403, Some("Proxy detectado".into())),
            Reply::Ok,
        ));
        let verdict = run(leaking_connector(), &reporter).await;
        assert_eq!(
            verdict,
            ConnectionVerdict::Blocked {
                reason: "Proxy detectado".into()
            }
        );
        assert!(reporter.verified.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_inconclusive() {
        let reporter = Arc::new(FakeReporter::new(Reply::Status(500, None), Reply::Ok));
        let verdict = run(leaking_connector(), &reporter).await;

        assert!(matches!(verdict, ConnectionVerdict::Inconclusive { .. }));
        assert!(!verdict.is_blocked());
        assert!(reporter.verified.lock().unwrap().is_empty());
    }
}

#[cfg(test)]
mod config_tests {
    use std::time::Duration;

    use crate::application::config::{DEFAULT_STUN_SERVERS, ProbeConfig};

    #[test]
    fn test_default_config() {
        let config = ProbeConfig::default();
        assert_eq!(config.ice_servers.len(), 5);
        assert_eq!(config.ice_servers[0].urls, "stun:stun.l.google.com:19302");
        assert_eq!(config.webrtc_timeout_ms(), 3000);
        assert_eq!(config.audio_timeout_ms(), 1000);
        assert_eq!(config.data_channel_label, "ip-detection");
        assert!(
            DEFAULT_STUN_SERVERS
                .iter()
                .all(|url| url.starts_with("stun:"))
        );
    }

    #[test]
    fn test_stun_timeout_never_exceeds_deadline() {
        let mut config = ProbeConfig::default();
        assert_eq!(config.effective_stun_timeout(), Duration::from_millis(2500));

        config.webrtc_timeout = Duration::from_millis(500);
        assert_eq!(config.effective_stun_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_with_stun_servers() {
        let config = ProbeConfig::default().with_stun_servers(vec!["stun:a.example:1", "stun:b.example"]);
        let rtc = config.rtc_configuration();
        assert_eq!(rtc.ice_servers.len(), 2);
        assert_eq!(rtc.ice_servers[1].urls, "stun:b.example");
        assert_eq!(config.webrtc_timeout_ms(), 3000);
    }
}

#[cfg(test)]
mod error_tests {
    use crate::error::ProbeError;
    use platform::stun::StunError;

    #[test]
    fn test_error_messages() {
        assert_eq!(ProbeError::WebRtcUnsupported.to_string(), "WebRTC not supported");
        assert_eq!(
            ProbeError::from(StunError::NoMappedAddress).to_string(),
            "STUN error: STUN response carries no mapped address"
        );
        assert_eq!(
            ProbeError::Rejected {
                status: 403,
                message: None
            }
            .to_string(),
            "Request rejected with status 403"
        );
    }

    #[test]
    fn test_is_forbidden() {
        assert!(
            ProbeError::Rejected {
                status: 403,
                message: None
            }
            .is_forbidden()
        );
        assert!(
            !ProbeError::Rejected {
                status: 500,
                message: None
            }
            .is_forbidden()
        );
        assert!(!ProbeError::WebRtcUnsupported.is_forbidden());
    }
}
