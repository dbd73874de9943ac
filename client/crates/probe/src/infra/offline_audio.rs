//! Offline Audio Context
//!
//! Software rendering of the fingerprint graph. The oscillator is sampled
//! directly into the script processor's input block; the muted gain stage
//! only affects the destination, which nobody listens to here.

use tokio::sync::oneshot;

use crate::domain::ports::AudioContext;
use crate::domain::value_objects::{AudioGraph, OscillatorType};
use crate::error::{ProbeError, ProbeResult};

/// Sample rate of the rendered block
pub const SAMPLE_RATE_HZ: f64 = 44_100.0;

/// Script processor block sizes accepted by Web Audio
const MIN_BUFFER_SIZE: usize = 256;
const MAX_BUFFER_SIZE: usize = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Stopped,
    Closed,
}

/// Single-use software audio context
#[derive(Debug)]
pub struct OfflineAudioContext {
    state: State,
}

impl OfflineAudioContext {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }
}

impl Default for OfflineAudioContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioContext for OfflineAudioContext {
    fn start(&mut self, graph: &AudioGraph) -> ProbeResult<oneshot::Receiver<Vec<f32>>> {
        if self.state != State::Idle {
            return Err(ProbeError::Surface("audio context already started".to_string()));
        }
        validate(graph)?;

        let block = render(graph.oscillator, f64::from(graph.frequency_hz), graph.buffer_size);
        let (tx, rx) = oneshot::channel();
        // Receiver is still in hand, the send cannot fail
        let _ = tx.send(block);

        self.state = State::Running;
        Ok(rx)
    }

    fn stop(&mut self) -> ProbeResult<()> {
        if self.state != State::Running {
            return Err(ProbeError::Surface("oscillator is not running".to_string()));
        }
        self.state = State::Stopped;
        Ok(())
    }

    fn close(&mut self) -> ProbeResult<()> {
        if self.state == State::Closed {
            return Err(ProbeError::Surface("audio context already closed".to_string()));
        }
        self.state = State::Closed;
        Ok(())
    }
}

fn validate(graph: &AudioGraph) -> ProbeResult<()> {
    let size = graph.buffer_size;
    if !size.is_power_of_two() || !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&size) {
        return Err(ProbeError::Surface(format!("invalid buffer size {}", size)));
    }
    if graph.input_channels == 0 || graph.output_channels == 0 {
        return Err(ProbeError::Surface("script processor needs channels".to_string()));
    }
    if !(graph.frequency_hz > 0.0 && f64::from(graph.frequency_hz) < SAMPLE_RATE_HZ / 2.0) {
        return Err(ProbeError::Surface(format!(
            "frequency {} Hz outside (0, Nyquist)",
            graph.frequency_hz
        )));
    }
    Ok(())
}

/// First `len` samples of the oscillator, phase starting at zero
fn render(oscillator: OscillatorType, frequency_hz: f64, len: usize) -> Vec<f32> {
    let step = frequency_hz / SAMPLE_RATE_HZ;
    (0..len)
        .map(|n| {
            let phase = (n as f64 * step).fract();
            waveform(oscillator, phase) as f32
        })
        .collect()
}

/// One period over `phase` in `[0, 1)`, peak amplitude 1
fn waveform(oscillator: OscillatorType, phase: f64) -> f64 {
    match oscillator {
        OscillatorType::Triangle => {
            if phase < 0.25 {
                4.0 * phase
            } else if phase < 0.75 {
                2.0 - 4.0 * phase
            } else {
                4.0 * phase - 4.0
            }
        }
    }
}
