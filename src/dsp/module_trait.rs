//! The core DspModule trait and supporting types.
//!
//! Every synthesizer module implements this interface. The patch graph
//! advances modules strictly in insertion order, once per sample, so the
//! trait is shaped around a single-tick `advance` rather than block
//! processing.

use rtrb::Consumer;

use super::context::TickContext;
use super::parameter::ParameterDefinition;
use super::port::{InputReading, PortDefinition};

/// Category of a DSP module, used for catalog organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleCategory {
    /// Sound sources (oscillators).
    Source,
    /// Modulation sources (envelopes).
    Modulation,
    /// Audio effects (delay, bit reduction).
    Effect,
    /// Utility modules (mixers, scopes).
    Utility,
    /// Output sinks.
    Output,
}

impl ModuleCategory {
    /// Returns a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            ModuleCategory::Source => "Source",
            ModuleCategory::Modulation => "Modulation",
            ModuleCategory::Effect => "Effect",
            ModuleCategory::Utility => "Utility",
            ModuleCategory::Output => "Output",
        }
    }
}

/// Static information about a DSP module kind.
#[derive(Clone, Debug)]
pub struct ModuleInfo {
    /// Unique identifier for the module kind (e.g., "osc.wave").
    pub id: &'static str,
    /// Human-readable name (e.g., "Wave Oscillator").
    pub name: &'static str,
    /// The category this module belongs to.
    pub category: ModuleCategory,
    /// A brief description of what the module does.
    pub description: &'static str,
}

impl ModuleInfo {
    /// Creates a new module info.
    pub fn new(
        id: &'static str,
        name: &'static str,
        category: ModuleCategory,
        description: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            category,
            description,
        }
    }
}

/// The interface every synthesizer module implements.
///
/// Modules are constructed and prepared on the control thread, then moved
/// whole into the audio callback, so the trait requires `Send + 'static`.
///
/// # Real-time Constraints
///
/// `advance` runs once per sample on the audio thread and must not
/// allocate, block, or perform I/O. Anything that needs heap storage is
/// allocated in `prepare`, which only ever runs on the control thread.
pub trait DspModule: Send + 'static {
    /// Returns static information about this module.
    fn info(&self) -> &ModuleInfo;

    /// Returns the port definitions for this module.
    ///
    /// Inputs come before outputs; the position within each direction is
    /// the port index used by cables and by the `advance` slices.
    fn ports(&self) -> &[PortDefinition];

    /// Returns the parameter definitions for this module.
    fn parameters(&self) -> &[ParameterDefinition];

    /// Prepares the module for a given sample rate.
    ///
    /// Runs on the control thread before the module joins the graph.
    /// Buffers whose length depends on the sample rate are allocated here.
    fn prepare(&mut self, sample_rate: f32);

    /// Computes one sample.
    ///
    /// The module must first recompute every entry of `outputs` from the
    /// resolved `inputs` and its current state, then advance its internal
    /// state by one tick. Outputs written here stay memoized until the next
    /// tick; later modules in the same pass see the fresh values, earlier
    /// modules (and the module itself, through a feedback cable) see them
    /// on the following tick.
    fn advance(
        &mut self,
        inputs: &[InputReading],
        outputs: &mut [f32],
        params: &[f32],
        context: &TickContext,
    );

    /// Resets the module to its initial state.
    fn reset(&mut self);

    /// Returns true for modules that terminate the signal path.
    ///
    /// The engine's produced sample is the resolved input of the
    /// designated sink.
    fn is_sink(&self) -> bool {
        false
    }

    /// Hands out the consumer side of the module's display tap, if any.
    ///
    /// Scope-like modules publish captured samples through an SPSC ring so
    /// the control thread can mirror their display buffer without touching
    /// audio state. Called once at construction time; the default has no
    /// tap.
    fn take_display_tap(&mut self) -> Option<Consumer<f32>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal module that doubles its input.
    struct Doubler {
        ports: Vec<PortDefinition>,
        parameters: Vec<ParameterDefinition>,
    }

    impl Doubler {
        fn new() -> Self {
            Self {
                ports: vec![
                    PortDefinition::input("signal", "Signal"),
                    PortDefinition::output("out", "Out"),
                ],
                parameters: vec![],
            }
        }
    }

    impl DspModule for Doubler {
        fn info(&self) -> &ModuleInfo {
            static INFO: ModuleInfo = ModuleInfo {
                id: "test.doubler",
                name: "Doubler",
                category: ModuleCategory::Utility,
                description: "Doubles the input signal",
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
            _params: &[f32],
            _context: &TickContext,
        ) {
            outputs[0] = inputs[0].value * 2.0;
        }

        fn reset(&mut self) {}
    }

    #[test]
    fn test_category_names() {
        assert_eq!(ModuleCategory::Source.name(), "Source");
        assert_eq!(ModuleCategory::Modulation.name(), "Modulation");
        assert_eq!(ModuleCategory::Effect.name(), "Effect");
        assert_eq!(ModuleCategory::Utility.name(), "Utility");
        assert_eq!(ModuleCategory::Output.name(), "Output");
    }

    #[test]
    fn test_module_info_creation() {
        let info = ModuleInfo::new("test.mod", "Test Module", ModuleCategory::Effect, "A test");
        assert_eq!(info.id, "test.mod");
        assert_eq!(info.name, "Test Module");
        assert_eq!(info.category, ModuleCategory::Effect);
    }

    #[test]
    fn test_advance_single_tick() {
        let mut module = Doubler::new();
        module.prepare(44100.0);

        let mut outputs = [0.0];
        let ctx = TickContext::default();
        module.advance(&[InputReading::from_source(0.25)], &mut outputs, &[], &ctx);
        assert_eq!(outputs[0], 0.5);
    }

    #[test]
    fn test_default_trait_hooks() {
        let mut module = Doubler::new();
        assert!(!module.is_sink());
        assert!(module.take_display_tap().is_none());
    }

    #[test]
    fn test_module_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Doubler>();
    }
}
