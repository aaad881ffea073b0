//! Mixer module.
//!
//! A single-channel level control with a knob-backed volume input.

use crate::dsp::{
    context::TickContext,
    module_trait::{DspModule, ModuleCategory, ModuleInfo},
    parameter::ParameterDefinition,
    port::{InputReading, PortDefinition},
};

/// A one-channel volume stage.
///
/// The signal jack is bare, so an unpatched mixer is silent. The volume
/// jack is knob-backed: a patched volume signal scales the knob, and the
/// resulting gain multiplies the signal.
///
/// # Ports
///
/// - **signal** (Input): the signal to attenuate.
/// - **volume** (Input, knob-backed): gain control.
/// - **out** (Output): the scaled signal.
pub struct Mixer {
    ports: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl Mixer {
    /// Creates a new mixer.
    pub fn new() -> Self {
        Self {
            ports: vec![
                PortDefinition::input("signal", "Signal"),
                PortDefinition::input("volume", "Volume"),
                PortDefinition::output("out", "Out"),
            ],
            parameters: vec![ParameterDefinition::knob("volume", "Volume")],
        }
    }

    /// Port index constants.
    const PORT_SIGNAL: usize = 0;
    const PORT_VOLUME: usize = 1;
    const PORT_OUT: usize = 0;

    /// Parameter index constants.
    const PARAM_VOLUME: usize = 0;
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl DspModule for Mixer {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "util.mixer",
            name: "Mixer",
            category: ModuleCategory::Utility,
            description: "Volume stage with a modulatable gain control",
        };
        &INFO
    }

    fn ports(&self) -> &[PortDefinition] {
        &self.ports
    }

    fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    fn prepare(&mut self, _sample_rate: f32) {}

    fn advance(
        &mut self,
        inputs: &[InputReading],
        outputs: &mut [f32],
        params: &[f32],
        _context: &TickContext,
    ) {
        let volume = inputs[Self::PORT_VOLUME].scale(params[Self::PARAM_VOLUME]);
        outputs[Self::PORT_OUT] = inputs[Self::PORT_SIGNAL].value * volume;
    }

    fn reset(&mut self) {}
}
