//! Audio processor.
//!
//! The object moved into the cpal callback. Each callback it applies the
//! pending structural commands, runs the patch graph one tick per frame
//! against a wall-clock deadline, purges removed modules at the buffer
//! boundary, and reports telemetry back to the controller.

use std::time::{Duration, Instant};

use crate::dsp::ModuleRegistry;
use crate::modules::{
    AdsrEnvelope, AudioOut, BitCrusher, DelayLine, Mixer, Scope, WaveOscillator,
};

use super::channels::EngineHandle;
use super::commands::EngineEvent;
use super::graph::PatchGraph;

/// Creates a registry with all built-in module kinds.
pub fn builtin_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register::<WaveOscillator>();
    registry.register::<AdsrEnvelope>();
    registry.register::<DelayLine>();
    registry.register::<BitCrusher>();
    registry.register::<Mixer>();
    registry.register::<Scope>();
    registry.register::<AudioOut>();
    registry
}

/// Runs the patch graph inside the audio callback.
pub struct AudioProcessor {
    graph: PatchGraph,
    handle: EngineHandle,
    sample_rate: f32,
    /// Last sample actually computed; pads the buffer on a deadline miss.
    last_sample: f32,
    /// Running peak since the last report.
    peak: f32,
    frames_since_peak: u32,
    /// Total deadline misses, for log throttling.
    misses: u64,
    /// Fraction of the real budget to allow. 1.0 in production.
    budget_scale: f32,
}

impl AudioProcessor {
    /// How many frames between wall-clock checks inside the tick loop.
    const DEADLINE_CHECK_INTERVAL: usize = 32;

    /// Frames between peak reports (~46ms at 44.1kHz).
    const PEAK_REPORT_INTERVAL: u32 = 2048;

    /// Log every Nth miss so a persistent overload cannot flood the log.
    const MISS_LOG_INTERVAL: u64 = 64;

    /// Creates a processor for the given sample rate.
    pub fn new(sample_rate: f32, handle: EngineHandle) -> Self {
        Self {
            graph: PatchGraph::new(sample_rate),
            handle,
            sample_rate,
            last_sample: 0.0,
            peak: 0.0,
            frames_since_peak: 0,
            misses: 0,
            budget_scale: 1.0,
        }
    }

    #[cfg(test)]
    fn set_budget_scale(&mut self, scale: f32) {
        self.budget_scale = scale;
    }

    /// Fills one output buffer.
    ///
    /// Commands drain first, so the graph never mutates mid-pass. The
    /// graph output is mono; each sample is duplicated across all device
    /// channels. Never unwinds, never blocks: on overrun the remaining
    /// frames repeat the last valid sample.
    pub fn process(&mut self, output: &mut [f32], channels: usize) {
        while let Some(cmd) = self.handle.recv_command() {
            self.graph.handle_command(cmd);
        }

        let channels = channels.max(1);
        let frames = output.len() / channels;
        let start = Instant::now();
        let budget = Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
            .mul_f32(self.budget_scale);
        let deadline = start + budget;

        let mut produced = 0;
        while produced < frames {
            if produced % Self::DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                break;
            }
            let sample = self.graph.tick();
            self.last_sample = sample;
            if sample.abs() > self.peak {
                self.peak = sample.abs();
            }
            for out in &mut output[produced * channels..(produced + 1) * channels] {
                *out = sample;
            }
            produced += 1;
        }

        if produced < frames {
            let frames_dropped = frames - produced;
            for out in &mut output[produced * channels..frames * channels] {
                *out = self.last_sample;
            }
            self.handle
                .send_event_lossy(EngineEvent::DeadlineMissed { frames_dropped });
            if self.misses % Self::MISS_LOG_INTERVAL == 0 {
                log::warn!(
                    "audio deadline missed, padded {} of {} frames",
                    frames_dropped,
                    frames
                );
            }
            self.misses += 1;
        }

        // cpal hands out whole frames, but a trailing partial frame must
        // still carry defined samples.
        for out in &mut output[frames * channels..] {
            *out = self.last_sample;
        }

        let handle = &mut self.handle;
        self.graph.apply_pending_removals(|slot| handle.discard(slot));

        self.frames_since_peak += frames as u32;
        if self.frames_since_peak >= Self::PEAK_REPORT_INTERVAL {
            self.handle
                .send_event_lossy(EngineEvent::OutputPeak(self.peak));
            self.peak = 0.0;
            self.frames_since_peak = 0;
        }
    }
}
