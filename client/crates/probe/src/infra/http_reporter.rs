//! HTTP Fingerprint Reporter
//!
//! `reqwest` client for the backend's fingerprint endpoints.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::domain::entities::ClientFingerprint;
use crate::domain::ports::FingerprintReporter;
use crate::domain::value_objects::VerifyOutcome;
use crate::error::{ProbeError, ProbeResult};
use crate::presentation::dto::{ErrorBody, FingerprintPayload, VerifyRequest, VerifyResponse};

const SUBMIT_PATH: &str = "/api/fingerprint/submit";
const VERIFY_PATH: &str = "/api/fingerprint/verify";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reporter backed by the fingerprint HTTP API
#[derive(Debug, Clone)]
pub struct HttpFingerprintReporter {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpFingerprintReporter {
    pub fn new(base_url: &str, token: Option<String>, user_agent: &str) -> ProbeResult<Self> {
        Self::with_builder(reqwest::Client::builder().user_agent(user_agent), base_url, token)
    }

    fn with_builder(
        builder: reqwest::ClientBuilder,
        base_url: &str,
        token: Option<String>,
    ) -> ProbeResult<Self> {
        let client = builder.timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl FingerprintReporter for HttpFingerprintReporter {
    async fn submit(&self, fingerprint: &ClientFingerprint) -> ProbeResult<()> {
        let payload = FingerprintPayload::from(fingerprint);
        let response = self
            .client
            .post(self.url(SUBMIT_PATH))
            .json(&payload)
            .send()
            .await?;

        ensure_success(response).await?;
        tracing::info!(device = %payload.device_digest, "Fingerprint submitted");
        Ok(())
    }

    async fn verify(&self, public_ips: &[Ipv4Addr]) -> ProbeResult<VerifyOutcome> {
        let request = VerifyRequest {
            webrtc_ips: public_ips.to_vec(),
        };

        let mut builder = self.client.post(self.url(VERIFY_PATH)).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = ensure_success(builder.send().await?).await?;
        let body: VerifyResponse = response.json().await?;

        tracing::info!(
            addresses = public_ips.len(),
            success = body.success,
            "Public addresses verified"
        );
        Ok(body.into())
    }
}

/// Turn a non-2xx response into [`ProbeError::Rejected`]
async fn ensure_success(response: reqwest::Response) -> ProbeResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|body| body.message);

    Err(ProbeError::Rejected {
        status: status.as_u16(),
        message,
    })
}
