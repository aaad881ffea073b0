//! Wave oscillator.
//!
//! The primary sound source: a phase accumulator driven at an exponential
//! frequency law, rendered as either a sine or a square wave.

use std::f32::consts::TAU;

use crate::dsp::{
    context::TickContext,
    module_trait::{DspModule, ModuleCategory, ModuleInfo},
    parameter::ParameterDefinition,
    port::{InputReading, PortDefinition},
};

/// Base frequency at a centered freq knob, in Hz.
const BASE_FREQ: f32 = 440.0;

/// A sine/square oscillator with knob-backed frequency and shape inputs.
///
/// The phase accumulator lives in [0, 1) and advances by
/// `440 * 2^(3 * freq) / sample_rate` each tick, so the freq control spans
/// three octaves either side of 440 Hz. The output for a tick is computed
/// from the phase *before* it advances: sample `n` of a fresh oscillator is
/// exactly `sin(2pi * n * f / sample_rate)`.
///
/// # Ports
///
/// - **freq** (Input, knob-backed): frequency control. A patched signal is
///   scaled by the knob; unpatched, the knob alone drives the pitch.
/// - **type** (Input, knob-backed): waveform select. Negative values give a
///   square wave, zero and above a sine.
/// - **out** (Output): the generated waveform.
pub struct WaveOscillator {
    /// Phase accumulator in [0, 1).
    phase: f32,
    /// Sample rate from the last prepare() call.
    sample_rate: f32,
    ports: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl WaveOscillator {
    /// Creates a new wave oscillator.
    pub fn new() -> Self {
        Self {
            phase: 0.0,
            sample_rate: 44100.0,
            ports: vec![
                PortDefinition::input("freq", "Freq"),
                PortDefinition::input("type", "Type"),
                PortDefinition::output("out", "Out"),
            ],
            parameters: vec![
                ParameterDefinition::knob("freq", "Freq"),
                ParameterDefinition::knob("type", "Type"),
            ],
        }
    }

    /// Port index constants.
    const PORT_FREQ: usize = 0;
    const PORT_TYPE: usize = 1;
    const PORT_OUT: usize = 0;

    /// Parameter index constants.
    const PARAM_FREQ: usize = 0;
    const PARAM_TYPE: usize = 1;
}

impl Default for WaveOscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl DspModule for WaveOscillator {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "osc.wave",
            name: "Wave Oscillator",
            category: ModuleCategory::Source,
            description: "Sine/square oscillator with exponential pitch control",
        };
        &INFO
    }

    fn ports(&self) -> &[PortDefinition] {
        &self.ports
    }

    fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn advance(
        &mut self,
        inputs: &[InputReading],
        outputs: &mut [f32],
        params: &[f32],
        _context: &TickContext,
    ) {
        let freq = inputs[Self::PORT_FREQ].scale(params[Self::PARAM_FREQ]);
        let shape = inputs[Self::PORT_TYPE].scale(params[Self::PARAM_TYPE]);

        outputs[Self::PORT_OUT] = if shape < 0.0 {
            if self.phase < 0.5 {
                -1.0
            } else {
                1.0
            }
        } else {
            (TAU * self.phase).sin()
        };

        self.phase += BASE_FREQ * (3.0 * freq).exp2() / self.sample_rate;
        if self.phase > 1.0 {
            self.phase -= 1.0;
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
