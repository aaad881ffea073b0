//! Scope module.
//!
//! Samples its input at a knob-controlled rate and publishes the captures
//! through an SPSC ring for the control thread to display.

use rtrb::{Consumer, Producer, RingBuffer};

use crate::dsp::{
    context::TickContext,
    module_trait::{DspModule, ModuleCategory, ModuleInfo},
    parameter::ParameterDefinition,
    port::{InputReading, PortDefinition},
};

/// Capacity of the display tap ring.
const TAP_CAPACITY: usize = 1024;

/// A signal scope.
///
/// Every `10^(rate + 1)` ticks the current input sample is captured, so the
/// rate knob spans one capture per tick at -1 up to one per 100 ticks at
/// +1. Captures go out through a lock-free tap; if the control thread falls
/// behind, the oldest captures are simply lost.
///
/// The scope has no output jack. It observes the signal without being part
/// of the audible path.
///
/// # Ports
///
/// - **signal** (Input): the signal to observe.
/// - **rate** (Input, knob-backed): capture interval control.
pub struct Scope {
    /// Ticks since the last capture.
    ticks: u32,
    tap_tx: Producer<f32>,
    /// Consumer side, handed out once via `take_display_tap`.
    tap_rx: Option<Consumer<f32>>,
    ports: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl Scope {
    /// Creates a new scope.
    pub fn new() -> Self {
        let (tap_tx, tap_rx) = RingBuffer::new(TAP_CAPACITY);
        Self {
            ticks: 0,
            tap_tx,
            tap_rx: Some(tap_rx),
            ports: vec![
                PortDefinition::input("signal", "Signal"),
                PortDefinition::input("rate", "Rate"),
            ],
            parameters: vec![ParameterDefinition::knob("rate", "Rate")],
        }
    }

    /// Port index constants.
    const PORT_SIGNAL: usize = 0;
    const PORT_RATE: usize = 1;

    /// Parameter index constants.
    const PARAM_RATE: usize = 0;
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl DspModule for Scope {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "util.scope",
            name: "Scope",
            category: ModuleCategory::Utility,
            description: "Captures the signal at a variable rate for display",
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
        _outputs: &mut [f32],
        params: &[f32],
        _context: &TickContext,
    ) {
        let rate = inputs[Self::PORT_RATE].scale(params[Self::PARAM_RATE]);
        let interval = 10f32.powf(rate + 1.0);

        self.ticks += 1;
        if self.ticks as f32 >= interval {
            // Lossy push; a stalled reader drops captures, not audio.
            let _ = self.tap_tx.push(inputs[Self::PORT_SIGNAL].value);
            self.ticks = 0;
        }
    }

    fn reset(&mut self) {
        self.ticks = 0;
    }

    fn take_display_tap(&mut self) -> Option<Consumer<f32>> {
        self.tap_rx.take()
    }
}
