//! Delay line module.
//!
//! A one-second circular delay with a knob-backed time control.

use crate::dsp::{
    context::TickContext,
    module_trait::{DspModule, ModuleCategory, ModuleInfo},
    parameter::ParameterDefinition,
    port::{InputReading, PortDefinition},
};

/// Maximum delay time in seconds.
const MAX_DELAY_SECONDS: f32 = 1.0;

/// A mono delay line.
///
/// Each tick the input sample is written at the cursor first and the output
/// read after, so the minimum setting is a true zero-latency pass-through.
/// The amount knob maps [-1, 1] to a delay of 0 to `MAX_DELAY_SECONDS`,
/// truncated to whole samples. Offset changes are not interpolated, so
/// sweeping the knob steps audibly.
///
/// # Ports
///
/// - **signal** (Input): the signal to delay.
/// - **amount** (Input, knob-backed): delay time control.
/// - **out** (Output): the delayed signal.
pub struct DelayLine {
    /// Circular buffer, one slot longer than the maximum offset.
    buffer: Vec<f32>,
    /// Write cursor.
    cursor: usize,
    /// Maximum offset in samples, `sample_rate * MAX_DELAY_SECONDS`.
    max_offset: f32,
    ports: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl DelayLine {
    /// Creates a new delay line.
    pub fn new() -> Self {
        let max_offset = 44100.0 * MAX_DELAY_SECONDS;
        Self {
            buffer: vec![0.0; max_offset as usize + 1],
            cursor: 0,
            max_offset,
            ports: vec![
                PortDefinition::input("signal", "Signal"),
                PortDefinition::input("amount", "Amount"),
                PortDefinition::output("out", "Out"),
            ],
            parameters: vec![ParameterDefinition::knob("amount", "Amount")],
        }
    }

    /// Port index constants.
    const PORT_SIGNAL: usize = 0;
    const PORT_AMOUNT: usize = 1;
    const PORT_OUT: usize = 0;

    /// Parameter index constants.
    const PARAM_AMOUNT: usize = 0;
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::new()
    }
}

impl DspModule for DelayLine {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "fx.delay",
            name: "Delay",
            category: ModuleCategory::Effect,
            description: "Mono delay line with up to one second of delay",
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
        self.max_offset = sample_rate * MAX_DELAY_SECONDS;
        self.buffer = vec![0.0; self.max_offset as usize + 1];
        self.cursor = 0;
    }

    fn advance(
        &mut self,
        inputs: &[InputReading],
        outputs: &mut [f32],
        params: &[f32],
        _context: &TickContext,
    ) {
        let amount = inputs[Self::PORT_AMOUNT].scale(params[Self::PARAM_AMOUNT]);
        let offset = ((amount + 1.0) / 2.0 * self.max_offset) as usize;

        // Write before read: offset 0 echoes the input on the same tick.
        let len = self.buffer.len();
        self.buffer[self.cursor] = inputs[Self::PORT_SIGNAL].value;
        outputs[Self::PORT_OUT] = self.buffer[(self.cursor + len - offset.min(len - 1)) % len];
        self.cursor = (self.cursor + 1) % len;
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 100.0;

    fn prepared() -> DelayLine {
        let mut delay = DelayLine::new();
        delay.prepare(SR);
        delay
    }

    fn feed(delay: &mut DelayLine, signal: f32, amount: f32) -> f32 {
        let ctx = TickContext::new(SR);
        let inputs = [
            InputReading::from_source(signal),
            InputReading::UNPATCHED,
        ];
        let mut outputs = [0.0];
        delay.advance(&inputs, &mut outputs, &[amount], &ctx);
        outputs[0]
    }

    #[test]
    fn test_delay_info() {
        let delay = DelayLine::new();
        assert_eq!(delay.info().id, "fx.delay");
        assert_eq!(delay.info().category, ModuleCategory::Effect);
        assert_eq!(delay.ports().len(), 3);
        assert_eq!(delay.parameters().len(), 1);
    }

    #[test]
    fn test_prepare_sizes_buffer_for_one_second() {
        let delay = prepared();
        assert_eq!(delay.buffer.len(), 101);
    }

    #[test]
    fn test_minimum_amount_is_zero_latency() {
        let mut delay = prepared();
        for n in 0..10 {
            let signal = n as f32 * 0.1;
            assert_eq!(feed(&mut delay, signal, -1.0), signal);
        }
    }

    #[test]
    fn test_maximum_amount_is_one_second() {
        let mut delay = prepared();

        // The first max-delay's worth of output is the buffer's silence.
        for n in 0..100 {
            assert_eq!(feed(&mut delay, n as f32, 1.0), 0.0);
        }
        // From tick 100 on, the output is the input 100 ticks ago.
        for n in 100..150 {
            assert_eq!(feed(&mut delay, n as f32, 1.0), (n - 100) as f32);
        }
    }

    #[test]
    fn test_offset_truncates_to_whole_samples() {
        // amount 0.25 maps to 62.5 samples, truncated to 62.
        let mut delay = prepared();
        for n in 0..62 {
            assert_eq!(feed(&mut delay, n as f32 + 1.0, 0.25), 0.0);
        }
        assert_eq!(feed(&mut delay, 63.0, 0.25), 1.0);
    }

    #[test]
    fn test_reset_clears_buffer() {
        let mut delay = prepared();
        for _ in 0..40 {
            feed(&mut delay, 0.7, 0.0);
        }
        delay.reset();
        // Half amount is a 50 sample offset; a cleared buffer reads silent.
        assert_eq!(feed(&mut delay, 0.9, 0.0), 0.0);
    }

    #[test]
    fn test_registry_instantiation() {
        use crate::dsp::ModuleRegistry;

        let mut registry = ModuleRegistry::new();
        registry.register::<DelayLine>();
        let module = registry.create("fx.delay").unwrap();
        assert_eq!(module.info().id, "fx.delay");
    }
}
