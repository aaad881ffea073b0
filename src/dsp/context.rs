//! Tick context for DSP modules.

/// Runtime information handed to modules on every tick.
#[derive(Clone, Copy, Debug)]
pub struct TickContext {
    /// The audio sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: f32,
}

impl TickContext {
    /// Creates a new tick context.
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }

    /// Converts a duration in seconds to a tick count.
    pub fn seconds_to_ticks(&self, seconds: f32) -> usize {
        (seconds * self.sample_rate).round() as usize
    }

    /// Converts a tick count to seconds.
    pub fn ticks_to_seconds(&self, ticks: usize) -> f32 {
        ticks as f32 / self.sample_rate
    }
}

impl Default for TickContext {
    fn default() -> Self {
        Self::new(44100.0)
    }
}
