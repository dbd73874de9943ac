//! Surface Sub-Probes
//!
//! Canvas, WebGL and audio fingerprints. Each probe resolves to a tagged
//! [`SurfaceFingerprint`] and never propagates an error.

use std::time::Duration;

use tokio::time::Instant;

use crate::domain::ports::{AudioContext, BrowserEnvironment, Canvas2d, WebGlContext};
use crate::domain::services::{audio_digest, audio_magnitude, canvas_digest, webgl_label};
use crate::domain::value_objects::{
    AudioGraph, SurfaceFingerprint, SurfaceKind, SurfaceOutcome, WebGlParameter,
};
use crate::error::ProbeResult;

const CANVAS_WIDTH: u32 = 200;
const CANVAS_HEIGHT: u32 = 50;
const WEBGL_DEBUG_EXTENSION: &str = "WEBGL_debug_renderer_info";

/// Render the fixed test pattern and digest the resulting data URL
pub fn canvas_fingerprint<E>(environment: &E) -> SurfaceFingerprint
where
    E: BrowserEnvironment,
{
    let outcome = match environment.create_canvas() {
        Ok(None) => SurfaceOutcome::Unavailable,
        Ok(Some(mut canvas)) => match draw_test_pattern(&mut canvas) {
            Ok(data_url) => SurfaceOutcome::Hash(canvas_digest(&data_url)),
            Err(e) => SurfaceOutcome::Failed(e.to_string()),
        },
        Err(e) => SurfaceOutcome::Failed(e.to_string()),
    };

    finish(SurfaceKind::Canvas, outcome)
}

fn draw_test_pattern<C>(canvas: &mut C) -> ProbeResult<String>
where
    C: Canvas2d,
{
    canvas.resize(CANVAS_WIDTH, CANVAS_HEIGHT);
    canvas.set_text_baseline("top");
    canvas.set_font("14px Arial");
    canvas.set_fill_style("#f60");
    canvas.fill_rect(125.0, 1.0, 62.0, 20.0);
    canvas.set_fill_style("#069");
    canvas.fill_text("TuSecreto 🤫", 2.0, 15.0)?;
    canvas.set_fill_style("rgba(102, 204, 0, 0.7)");
    canvas.fill_text("Fingerprint Test", 4.0, 30.0)?;
    canvas.to_data_url()
}

/// Unmasked vendor and renderer, when the debug extension is exposed
pub fn webgl_fingerprint<E>(environment: &E) -> SurfaceFingerprint
where
    E: BrowserEnvironment,
{
    let outcome = match environment.create_webgl_context() {
        Ok(None) => SurfaceOutcome::Unavailable,
        Ok(Some(gl)) if !gl.has_extension(WEBGL_DEBUG_EXTENSION) => SurfaceOutcome::Limited,
        Ok(Some(gl)) => match read_renderer(&gl) {
            Ok(label) => SurfaceOutcome::Hash(label),
            Err(e) => SurfaceOutcome::Failed(e.to_string()),
        },
        Err(e) => SurfaceOutcome::Failed(e.to_string()),
    };

    finish(SurfaceKind::WebGl, outcome)
}

fn read_renderer<G>(gl: &G) -> ProbeResult<String>
where
    G: WebGlContext,
{
    let vendor = gl.parameter(WebGlParameter::UnmaskedVendor)?;
    let renderer = gl.parameter(WebGlParameter::UnmaskedRenderer)?;
    Ok(webgl_label(&vendor, &renderer))
}

/// Run the muted oscillator graph and digest the first processed buffer
///
/// Resolves to `TimedOut` when no buffer arrives within `timeout`.
pub async fn audio_fingerprint<E>(environment: &E, timeout: Duration) -> SurfaceFingerprint
where
    E: BrowserEnvironment,
{
    let mut context = match environment.create_audio_context() {
        Ok(Some(context)) => context,
        Ok(None) => return finish(SurfaceKind::Audio, SurfaceOutcome::Unavailable),
        Err(e) => return finish(SurfaceKind::Audio, SurfaceOutcome::Failed(e.to_string())),
    };

    let buffer = match context.start(&AudioGraph::FINGERPRINT) {
        Ok(buffer) => buffer,
        Err(e) => {
            teardown(&mut context, false);
            return finish(SurfaceKind::Audio, SurfaceOutcome::Failed(e.to_string()));
        }
    };

    let deadline = Instant::now() + timeout;
    let outcome = match tokio::time::timeout_at(deadline, buffer).await {
        Ok(Ok(samples)) => SurfaceOutcome::Hash(audio_digest(audio_magnitude(&samples))),
        Ok(Err(_)) => {
            // Processor went away without a buffer; only the deadline decides
            tokio::time::sleep_until(deadline).await;
            SurfaceOutcome::TimedOut
        }
        Err(_) => SurfaceOutcome::TimedOut,
    };

    teardown(&mut context, true);
    finish(SurfaceKind::Audio, outcome)
}

fn teardown<A>(context: &mut A, started: bool)
where
    A: AudioContext,
{
    if started {
        if let Err(e) = context.stop() {
            tracing::debug!(error = %e, "Audio oscillator stop failed");
        }
    }
    if let Err(e) = context.close() {
        tracing::debug!(error = %e, "Audio context close failed");
    }
}

fn finish(kind: SurfaceKind, outcome: SurfaceOutcome) -> SurfaceFingerprint {
    match &outcome {
        SurfaceOutcome::Hash(_) => tracing::debug!(surface = %kind, "Surface fingerprint taken"),
        SurfaceOutcome::Failed(reason) => {
            tracing::debug!(surface = %kind, reason = %reason, "Surface probe failed")
        }
        other => tracing::debug!(surface = %kind, outcome = ?other, "Surface probe degraded"),
    }
    SurfaceFingerprint::new(kind, outcome)
}
