//! Check Connection Use Case
//!
//! Reports the fingerprint to the backend and, when public addresses
//! leaked, asks it whether the connection looks like a VPN or proxy.

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::application::collect_fingerprint::CollectFingerprintUseCase;
use crate::domain::entities::{ClientFingerprint, ConnectionVerdict};
use crate::domain::ports::{BrowserEnvironment, FingerprintReporter, PeerConnector};
use crate::error::ProbeError;

/// Reason used when the backend blocks without a message
pub const DEFAULT_BLOCK_REASON: &str = "VPN/Proxy detected";

/// Check connection output
#[derive(Debug, Clone)]
pub struct CheckConnectionOutput {
    pub fingerprint: ClientFingerprint,
    pub verdict: ConnectionVerdict,
}

/// Check connection use case
pub struct CheckConnectionUseCase<C, E, R>
where
    C: PeerConnector,
    E: BrowserEnvironment,
    R: FingerprintReporter,
{
    collect: CollectFingerprintUseCase<C, E>,
    reporter: Arc<R>,
}

impl<C, E, R> CheckConnectionUseCase<C, E, R>
where
    C: PeerConnector,
    E: BrowserEnvironment,
    R: FingerprintReporter,
{
    pub fn new(collect: CollectFingerprintUseCase<C, E>, reporter: Arc<R>) -> Self {
        Self { collect, reporter }
    }

    pub async fn execute(&self) -> CheckConnectionOutput {
        let fingerprint = self.collect.execute().await;
        let verdict = self.verdict_for(&fingerprint).await;

        match &verdict {
            ConnectionVerdict::Clear => tracing::info!("Connection clear"),
            ConnectionVerdict::Blocked { reason } => {
                tracing::warn!(reason = %reason, "Connection blocked")
            }
            ConnectionVerdict::Inconclusive { reason } => {
                tracing::warn!(reason = %reason, "Connection check inconclusive")
            }
        }

        CheckConnectionOutput {
            fingerprint,
            verdict,
        }
    }

    async fn verdict_for(&self, fingerprint: &ClientFingerprint) -> ConnectionVerdict {
        if let Err(e) = self.reporter.submit(fingerprint).await {
            return verdict_from_error(e);
        }

        let public_ips: Vec<Ipv4Addr> = fingerprint.webrtc.public_ips().iter().copied().collect();
        if public_ips.is_empty() {
            return ConnectionVerdict::Clear;
        }

        match self.reporter.verify(&public_ips).await {
            Ok(outcome) if outcome.success => ConnectionVerdict::Clear,
            Ok(outcome) => ConnectionVerdict::Blocked {
                reason: outcome
                    .message
                    .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string()),
            },
            Err(e) => verdict_from_error(e),
        }
    }
}

fn verdict_from_error(error: ProbeError) -> ConnectionVerdict {
    error.log();
    if error.is_forbidden() {
        let reason = match error {
            ProbeError::Rejected {
                message: Some(message),
                ..
            } => message,
            _ => DEFAULT_BLOCK_REASON.to_string(),
        };
        return ConnectionVerdict::Blocked { reason };
    }
    ConnectionVerdict::Inconclusive {
        reason: error.to_string(),
    }
}
