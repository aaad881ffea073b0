//! Audio output module.
//!
//! The terminal of the signal path: whatever resolves at its input jack is
//! the sample the engine sends to the speakers.

use crate::dsp::{
    context::TickContext,
    module_trait::{DspModule, ModuleCategory, ModuleInfo},
    parameter::ParameterDefinition,
    port::{InputReading, PortDefinition},
};

/// The speaker module.
///
/// Holds no state and does no processing; the engine reads the resolved
/// value at its single input jack after each tick. A patch with no sink, or
/// a sink with nothing patched, plays silence.
pub struct AudioOut {
    ports: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl AudioOut {
    /// Creates a new audio output.
    pub fn new() -> Self {
        Self {
            ports: vec![PortDefinition::input("signal", "Signal")],
            parameters: vec![],
        }
    }
}

impl Default for AudioOut {
    fn default() -> Self {
        Self::new()
    }
}

impl DspModule for AudioOut {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "out.main",
            name: "Audio Out",
            category: ModuleCategory::Output,
            description: "Routes the patched signal to the speakers",
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
        _inputs: &[InputReading],
        _outputs: &mut [f32],
        _params: &[f32],
        _context: &TickContext,
    ) {
    }

    fn reset(&mut self) {}

    fn is_sink(&self) -> bool {
        true
    }
}
