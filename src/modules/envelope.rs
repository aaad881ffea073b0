//! ADSR envelope module.
//!
//! Piecewise-linear attack/decay/sustain/release generator driven by a
//! button-backed trigger input.

use crate::dsp::{
    context::TickContext,
    module_trait::{DspModule, ModuleCategory, ModuleInfo},
    parameter::ParameterDefinition,
    port::{InputReading, PortDefinition},
};

/// ADSR envelope generator.
///
/// While the trigger is held the output ramps linearly from the value it
/// released at up to 1 over `attack` seconds, decays linearly to `sustain`
/// over `decay` seconds, then holds. When the trigger drops it ramps
/// linearly from the held value down to 0 over `release` seconds. All four
/// time knobs map their [-1, 1] position to a [0, 1] second range; sustain
/// maps to a [0, 1] level.
///
/// A retrigger during release restarts the attack from the released value,
/// so the output never jumps.
///
/// # Ports
///
/// - **attack**, **decay**, **sustain**, **release** (Input, knob-backed):
///   stage controls, modulatable by patching a signal over the knob.
/// - **trigger** (Input, button-backed): gate. A patched signal overrides
///   the front-panel button.
/// - **out** (Output): the envelope level in [0, 1].
pub struct AdsrEnvelope {
    /// Whether the trigger was held on the previous tick.
    pressed: bool,
    /// Ticks since the trigger edge.
    press_ticks: f32,
    /// Level reached while held; release ramps down from it.
    press_value: f32,
    /// Ticks since the trigger dropped. Starts past any release time so a
    /// fresh envelope idles at 0.
    release_ticks: f32,
    /// Level the last release settled at; attack ramps up from it.
    release_value: f32,
    /// Sample rate from the last prepare() call.
    sample_rate: f32,
    ports: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl AdsrEnvelope {
    /// Creates a new ADSR envelope.
    pub fn new() -> Self {
        Self {
            pressed: false,
            press_ticks: 0.0,
            press_value: 0.0,
            release_ticks: 2.0 * 44100.0,
            release_value: 0.0,
            sample_rate: 44100.0,
            ports: vec![
                PortDefinition::input("attack", "Attack"),
                PortDefinition::input("decay", "Decay"),
                PortDefinition::input("sustain", "Sustain"),
                PortDefinition::input("release", "Release"),
                PortDefinition::input("trigger", "Trigger"),
                PortDefinition::output("out", "Out"),
            ],
            parameters: vec![
                ParameterDefinition::knob("attack", "Attack"),
                ParameterDefinition::knob("decay", "Decay"),
                ParameterDefinition::knob("sustain", "Sustain"),
                ParameterDefinition::knob("release", "Release"),
                ParameterDefinition::button("trigger", "Trigger"),
            ],
        }
    }

    /// Port index constants.
    const PORT_ATTACK: usize = 0;
    const PORT_DECAY: usize = 1;
    const PORT_SUSTAIN: usize = 2;
    const PORT_RELEASE: usize = 3;
    const PORT_TRIGGER: usize = 4;
    const PORT_OUT: usize = 0;

    /// Parameter index constants.
    const PARAM_ATTACK: usize = 0;
    const PARAM_DECAY: usize = 1;
    const PARAM_SUSTAIN: usize = 2;
    const PARAM_RELEASE: usize = 3;
    const PARAM_TRIGGER: usize = 4;

    /// Maps a bipolar stage control to its [0, 1] range.
    #[inline]
    fn unipolar(value: f32) -> f32 {
        (value + 1.0) / 2.0
    }
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl DspModule for AdsrEnvelope {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "env.adsr",
            name: "ADSR Envelope",
            category: ModuleCategory::Modulation,
            description: "Attack-Decay-Sustain-Release envelope generator",
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
        self.release_ticks = 2.0 * sample_rate;
    }

    fn advance(
        &mut self,
        inputs: &[InputReading],
        outputs: &mut [f32],
        params: &[f32],
        _context: &TickContext,
    ) {
        let atk = Self::unipolar(inputs[Self::PORT_ATTACK].scale(params[Self::PARAM_ATTACK]));
        let dec = Self::unipolar(inputs[Self::PORT_DECAY].scale(params[Self::PARAM_DECAY]));
        let sus = Self::unipolar(inputs[Self::PORT_SUSTAIN].scale(params[Self::PARAM_SUSTAIN]));
        let rel = Self::unipolar(inputs[Self::PORT_RELEASE].scale(params[Self::PARAM_RELEASE]));

        // Output first, from the previous tick's trigger state; the edge is
        // only acted on below, so a press lands one sample later.
        outputs[Self::PORT_OUT] = if self.pressed {
            let t = self.press_ticks / self.sample_rate;
            self.press_value = if t < atk {
                (1.0 - self.release_value) * t / atk + self.release_value
            } else if t < atk + dec {
                sus + (1.0 - sus) * (atk + dec - t) / dec
            } else {
                sus
            };
            self.press_value
        } else {
            let t = self.release_ticks / self.sample_rate;
            self.release_value = if t < rel {
                self.press_value * (rel - t) / rel
            } else {
                0.0
            };
            self.release_value
        };

        let held = inputs[Self::PORT_TRIGGER].or_manual(params[Self::PARAM_TRIGGER]) > 0.0;
        if !self.pressed && held {
            self.press_ticks = 0.0;
            self.release_ticks = 0.0;
        }
        self.pressed = held;
        if self.pressed {
            self.press_ticks += 1.0;
        } else {
            self.release_ticks += 1.0;
        }
    }

    fn reset(&mut self) {
        self.pressed = false;
        self.press_ticks = 0.0;
        self.press_value = 0.0;
        self.release_ticks = 2.0 * self.sample_rate;
        self.release_value = 0.0;
    }
}
