//! Bit crusher module.
//!
//! Quantizes the signal to a depth-controlled number of levels.

use crate::dsp::{
    context::TickContext,
    module_trait::{DspModule, ModuleCategory, ModuleInfo},
    parameter::ParameterDefinition,
    port::{InputReading, PortDefinition},
};

/// A bit-depth reducer.
///
/// The signal is quantized to `2^(4 * (depth + 1))` levels per unit, so the
/// depth knob spans 1 level at -1 up to 256 levels at +1. Rounding is
/// half-away-from-zero and the result clamps to [-1, 1].
///
/// # Ports
///
/// - **signal** (Input): the signal to quantize.
/// - **depth** (Input, knob-backed): resolution control.
/// - **out** (Output): the quantized signal.
pub struct BitCrusher {
    ports: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl BitCrusher {
    /// Creates a new bit crusher.
    pub fn new() -> Self {
        Self {
            ports: vec![
                PortDefinition::input("signal", "Signal"),
                PortDefinition::input("depth", "Depth"),
                PortDefinition::output("out", "Out"),
            ],
            parameters: vec![ParameterDefinition::knob("depth", "Depth")],
        }
    }

    /// Port index constants.
    const PORT_SIGNAL: usize = 0;
    const PORT_DEPTH: usize = 1;
    const PORT_OUT: usize = 0;

    /// Parameter index constants.
    const PARAM_DEPTH: usize = 0;
}

impl Default for BitCrusher {
    fn default() -> Self {
        Self::new()
    }
}

impl DspModule for BitCrusher {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "fx.bitcrush",
            name: "Bit Crusher",
            category: ModuleCategory::Effect,
            description: "Quantizes the signal to a reduced bit depth",
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
        let depth = inputs[Self::PORT_DEPTH].scale(params[Self::PARAM_DEPTH]);
        let levels = (4.0 * (depth + 1.0)).exp2();
        let signal = inputs[Self::PORT_SIGNAL].value;
        outputs[Self::PORT_OUT] = ((signal * levels).round() / levels).clamp(-1.0, 1.0);
    }

    fn reset(&mut self) {}
}
