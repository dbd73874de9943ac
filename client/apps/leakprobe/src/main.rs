//! Leak Probe Entry Point
//!
//! Collects a client fingerprint on the local host and prints it as JSON.
//! With `PROBE_REPORT=true` the fingerprint is also reported and the
//! backend's verdict decides the exit code. Uses `anyhow` for startup
//! errors only; the probe itself never fails.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use probe::{
    CheckConnectionPayload, CheckConnectionUseCase, CollectFingerprintUseCase, FingerprintPayload,
    HttpFingerprintReporter, NativeEnvironment, ProbeConfig, StunPeerConnector,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_API_URL: &str = "https://api.tusecreto.net";

/// Exit code when the backend blocks the connection
const EXIT_BLOCKED: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr, stdout carries the JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leakprobe=info,probe=info,platform=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Arc::new(load_probe_config()?);
    let report = parse_flag(env::var("PROBE_REPORT").ok().as_deref())?;

    tracing::info!(
        servers = config.ice_servers.len(),
        webrtc_timeout_ms = config.webrtc_timeout_ms(),
        audio_timeout_ms = config.audio_timeout_ms(),
        report = report,
        "Starting probe"
    );

    let environment = Arc::new(NativeEnvironment::new());
    let user_agent = environment.user_agent().to_string();
    let connector = Arc::new(StunPeerConnector::new(config.effective_stun_timeout()));
    let collect = CollectFingerprintUseCase::new(Some(connector), environment, config);

    if !report {
        let fingerprint = collect.execute().await;
        println!(
            "{}",
            serde_json::to_string_pretty(&FingerprintPayload::from(&fingerprint))?
        );
        return Ok(ExitCode::SUCCESS);
    }

    let api_url = env::var("TUSECRETO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let token = env::var("TUSECRETO_TOKEN").ok().filter(|t| !t.is_empty());
    let reporter = HttpFingerprintReporter::new(&api_url, token, &user_agent)
        .context("building fingerprint reporter")?;

    let output = CheckConnectionUseCase::new(collect, Arc::new(reporter))
        .execute()
        .await;
    println!(
        "{}",
        serde_json::to_string_pretty(&CheckConnectionPayload::from(&output))?
    );

    if output.verdict.is_blocked() {
        return Ok(ExitCode::from(EXIT_BLOCKED));
    }
    Ok(ExitCode::SUCCESS)
}

/// Probe configuration from `PROBE_*` variables, defaults otherwise
fn load_probe_config() -> anyhow::Result<ProbeConfig> {
    let mut config = ProbeConfig::default();

    if let Ok(list) = env::var("PROBE_STUN_SERVERS") {
        let servers = parse_server_list(&list);
        if servers.is_empty() {
            bail!("PROBE_STUN_SERVERS is set but lists no server");
        }
        config = config.with_stun_servers(servers);
    }
    if let Some(timeout) = parse_millis("PROBE_WEBRTC_TIMEOUT_MS")? {
        config.webrtc_timeout = timeout;
    }
    if let Some(timeout) = parse_millis("PROBE_AUDIO_TIMEOUT_MS")? {
        config.audio_timeout = timeout;
    }

    Ok(config)
}

fn parse_server_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_millis(key: &str) -> anyhow::Result<Option<Duration>> {
    let Ok(raw) = env::var(key) else {
        return Ok(None);
    };
    let millis: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number of milliseconds"))?;
    if millis == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Some(Duration::from_millis(millis)))
}

fn parse_flag(value: Option<&str>) -> anyhow::Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => bail!("PROBE_REPORT must be true or false, got {other:?}"),
    }
}
