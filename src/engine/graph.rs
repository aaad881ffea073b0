//! The patch graph.
//!
//! Owns every module slot and cable on the audio side and evaluates them
//! once per sample, strictly in insertion order. There is no topological
//! sort: a module reading a source that has not advanced yet this tick
//! (including itself, through a feedback cable) sees the previous tick's
//! memoized output, which is what makes cycles legal at the cost of one
//! sample of latency. Forward connections are zero-latency.

use std::fmt;

use crate::dsp::{DspModule, InputReading, PortDirection, TickContext};

use super::commands::{CableId, EngineCommand, ModuleId, PortRef};

/// Upper bound on ports per direction, sized for the widest built-in.
pub const MAX_PORTS: usize = 8;

/// One module's storage inside the graph.
///
/// Slots are built and prepared on the control thread; the audio thread
/// only ever moves them in and out whole.
pub struct ModuleSlot {
    /// Handle the controller addresses this slot by.
    pub id: ModuleId,
    /// The module instance.
    pub module: Box<dyn DspModule>,
    /// Memoized output values, one per output port, refreshed each tick.
    pub outputs: Box<[f32]>,
    /// Current parameter values, one per parameter definition.
    pub params: Box<[f32]>,
    /// Cached source for each input: (slot index, output index).
    links: Box<[Option<(usize, usize)>]>,
    /// Number of input ports.
    input_count: usize,
    /// Set when removal was requested; the slot keeps ticking until the
    /// next buffer boundary purge.
    pub pending_removal: bool,
}

impl ModuleSlot {
    /// Builds a slot around a module, preparing it for the sample rate.
    ///
    /// All allocation happens here, on the control thread.
    pub fn new(id: ModuleId, mut module: Box<dyn DspModule>, sample_rate: f32) -> Self {
        module.prepare(sample_rate);

        let input_count = module.ports().iter().filter(|p| p.is_input()).count();
        let output_count = module.ports().iter().filter(|p| p.is_output()).count();
        assert!(
            input_count <= MAX_PORTS && output_count <= MAX_PORTS,
            "module '{}' exceeds the port limit",
            module.info().id
        );

        let params: Box<[f32]> = module.parameters().iter().map(|p| p.default).collect();

        Self {
            id,
            module,
            outputs: vec![0.0; output_count].into_boxed_slice(),
            params,
            links: vec![None; input_count].into_boxed_slice(),
            input_count,
            pending_removal: false,
        }
    }

    /// Number of input ports.
    pub fn input_count(&self) -> usize {
        self.input_count
    }
}

impl fmt::Debug for ModuleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSlot")
            .field("id", &self.id)
            .field("kind", &self.module.info().id)
            .field("pending_removal", &self.pending_removal)
            .finish()
    }
}

/// A cable with two optionally bound ends.
#[derive(Clone, Copy, Debug)]
pub struct CableState {
    pub id: CableId,
    pub ends: [Option<PortRef>; 2],
}

/// The audio-side patch graph.
pub struct PatchGraph {
    /// Module slots in insertion order. Never re-sorted.
    modules: Vec<ModuleSlot>,
    /// All cables, bound or dangling.
    cables: Vec<CableState>,
    /// The module whose resolved input is the engine's output.
    sink: Option<ModuleId>,
    context: TickContext,
}

impl PatchGraph {
    /// Creates an empty graph for the given sample rate.
    ///
    /// Capacity is reserved up front so command-driven pushes stay off the
    /// allocator in the common case.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            modules: Vec::with_capacity(64),
            cables: Vec::with_capacity(128),
            sink: None,
            context: TickContext::new(sample_rate),
        }
    }

    /// Applies one structural command.
    ///
    /// Stale handles (a command racing a removal) are ignored with a log
    /// line; the control side already reported the operation.
    pub fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::AddModule { slot } => {
                self.modules.push(*slot);
                self.relink();
            }
            EngineCommand::RemoveModule { id } => {
                if !self.modules.iter().any(|s| s.id == id) {
                    log::debug!("remove for unknown module {}", id);
                    return;
                }
                for cable in &mut self.cables {
                    for end in &mut cable.ends {
                        if end.map(|p| p.module) == Some(id) {
                            *end = None;
                        }
                    }
                }
                if let Some(slot) = self.modules.iter_mut().find(|s| s.id == id) {
                    slot.pending_removal = true;
                }
                self.relink();
            }
            EngineCommand::AddCable { id } => {
                self.cables.push(CableState {
                    id,
                    ends: [None, None],
                });
            }
            EngineCommand::RemoveCable { id } => {
                self.cables.retain(|c| c.id != id);
                self.relink();
            }
            EngineCommand::BindEnd { cable, end, port } => {
                // A port holds at most one binding: stealing first keeps
                // the invariant no matter which cable asked.
                for c in &mut self.cables {
                    for e in &mut c.ends {
                        if *e == Some(port) {
                            *e = None;
                        }
                    }
                }
                match self.cables.iter_mut().find(|c| c.id == cable) {
                    Some(c) => c.ends[end.index()] = Some(port),
                    None => log::debug!("bind for unknown cable {}", cable),
                }
                self.relink();
            }
            EngineCommand::UnbindEnd { cable, end } => {
                match self.cables.iter_mut().find(|c| c.id == cable) {
                    Some(c) => c.ends[end.index()] = None,
                    None => log::debug!("unbind for unknown cable {}", cable),
                }
                self.relink();
            }
            EngineCommand::SetParameter {
                module,
                param_index,
                value,
            } => match self.modules.iter_mut().find(|s| s.id == module) {
                Some(slot) => {
                    if let Some(def) = slot.module.parameters().get(param_index) {
                        slot.params[param_index] = def.clamp(value);
                    } else {
                        log::debug!("parameter {} out of range on module {}", param_index, module);
                    }
                }
                None => log::debug!("set_parameter for unknown module {}", module),
            },
            EngineCommand::DesignateSink { module } => {
                if self.modules.iter().any(|s| s.id == module) {
                    self.sink = Some(module);
                } else {
                    log::debug!("sink designation for unknown module {}", module);
                }
            }
        }
    }

    /// Advances every module one sample in insertion order and returns the
    /// sink's resolved input.
    pub fn tick(&mut self) -> f32 {
        let ctx = self.context;
        for i in 0..self.modules.len() {
            let mut readings = [InputReading::UNPATCHED; MAX_PORTS];
            let n = self.modules[i].input_count;
            for k in 0..n {
                if let Some((src, out)) = self.modules[i].links[k] {
                    readings[k] = InputReading::from_source(self.modules[src].outputs[out]);
                }
            }
            let ModuleSlot {
                module,
                outputs,
                params,
                ..
            } = &mut self.modules[i];
            module.advance(&readings[..n], outputs, params, &ctx);
        }
        self.sink_sample()
    }

    /// Purges slots flagged for removal, handing each to `dispose`.
    ///
    /// Runs only at buffer boundaries, never between ticks of a pass.
    pub fn apply_pending_removals<F: FnMut(ModuleSlot)>(&mut self, mut dispose: F) {
        let mut i = 0;
        while i < self.modules.len() {
            if self.modules[i].pending_removal {
                let slot = self.modules.remove(i);
                if self.sink == Some(slot.id) {
                    self.sink = None;
                }
                dispose(slot);
            } else {
                i += 1;
            }
        }
        self.relink();
    }

    /// The current output sample: the designated sink's resolved input,
    /// or silence without one.
    fn sink_sample(&self) -> f32 {
        let Some(sink) = self.sink else { return 0.0 };
        let Some(i) = self.modules.iter().position(|s| s.id == sink) else {
            return 0.0;
        };
        match self.modules[i].links.first().copied().flatten() {
            Some((src, out)) => self.modules[src].outputs[out],
            None => 0.0,
        }
    }

    /// Recomputes every input's cached source after a structural change so
    /// the per-tick path does no searching.
    fn relink(&mut self) {
        for i in 0..self.modules.len() {
            for k in 0..self.modules[i].input_count {
                let link =
                    Self::resolve_source(&self.modules, &self.cables, self.modules[i].id, k);
                self.modules[i].links[k] = link;
            }
        }
    }

    /// Follows the cable plugged into an input, if any, to a live output.
    fn resolve_source(
        modules: &[ModuleSlot],
        cables: &[CableState],
        module: ModuleId,
        input: usize,
    ) -> Option<(usize, usize)> {
        let target = PortRef::input(module, input);
        for cable in cables {
            for e in 0..2 {
                if cable.ends[e] == Some(target) {
                    // Binding exclusivity guarantees this is the only
                    // cable at the port.
                    let other = cable.ends[1 - e]?;
                    if other.direction != PortDirection::Output {
                        return None;
                    }
                    let src = modules.iter().position(|s| s.id == other.module)?;
                    if other.index >= modules[src].outputs.len() {
                        return None;
                    }
                    return Some((src, other.index));
                }
            }
        }
        None
    }

    /// Number of live slots (including those pending removal).
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of cables.
    pub fn cable_count(&self) -> usize {
        self.cables.len()
    }

    /// The designated sink, if any.
    pub fn sink(&self) -> Option<ModuleId> {
        self.sink
    }

    /// A module's memoized output value.
    pub fn module_output(&self, id: ModuleId, output: usize) -> Option<f32> {
        let slot = self.modules.iter().find(|s| s.id == id)?;
        slot.outputs.get(output).copied()
    }

    /// A cable's current endpoints.
    pub fn cable_ends(&self, id: CableId) -> Option<[Option<PortRef>; 2]> {
        self.cables.iter().find(|c| c.id == id).map(|c| c.ends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{ModuleCategory, ModuleInfo, ParameterDefinition, PortDefinition};
    use crate::engine::commands::CableEnd;

    /// Emits its "level" knob every tick.
    struct ConstSource {
        ports: Vec<PortDefinition>,
        parameters: Vec<ParameterDefinition>,
    }

    impl Default for ConstSource {
        fn default() -> Self {
            Self {
                ports: vec![PortDefinition::output("out", "Out")],
                parameters: vec![ParameterDefinition::knob("level", "Level")],
            }
        }
    }

    impl DspModule for ConstSource {
        fn info(&self) -> &ModuleInfo {
            static INFO: ModuleInfo = ModuleInfo {
                id: "test.const",
                name: "Const",
                category: ModuleCategory::Source,
                description: "Constant source",
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
            outputs: &mut [f32],
            params: &[f32],
            _context: &TickContext,
        ) {
            outputs[0] = params[0];
        }
        fn reset(&mut self) {}
    }

    /// Outputs its input plus one; cabling it to itself makes a counter.
    struct AddOne {
        ports: Vec<PortDefinition>,
        parameters: Vec<ParameterDefinition>,
    }

    impl Default for AddOne {
        fn default() -> Self {
            Self {
                ports: vec![
                    PortDefinition::input("signal", "Signal"),
                    PortDefinition::output("out", "Out"),
                ],
                parameters: vec![],
            }
        }
    }

    impl DspModule for AddOne {
        fn info(&self) -> &ModuleInfo {
            static INFO: ModuleInfo = ModuleInfo {
                id: "test.add_one",
                name: "Add One",
                category: ModuleCategory::Utility,
                description: "input + 1",
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
            outputs[0] = inputs[0].value + 1.0;
        }
        fn reset(&mut self) {}
    }

    /// Terminal module with a single input and no outputs.
    struct TestSink {
        ports: Vec<PortDefinition>,
        parameters: Vec<ParameterDefinition>,
    }

    impl Default for TestSink {
        fn default() -> Self {
            Self {
                ports: vec![PortDefinition::input("signal", "Signal")],
                parameters: vec![],
            }
        }
    }

    impl DspModule for TestSink {
        fn info(&self) -> &ModuleInfo {
            static INFO: ModuleInfo = ModuleInfo {
                id: "test.sink",
                name: "Sink",
                category: ModuleCategory::Output,
                description: "Terminal",
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

    fn add<M: DspModule + Default>(graph: &mut PatchGraph, id: ModuleId) {
        let slot = ModuleSlot::new(id, Box::new(M::default()), 44100.0);
        graph.handle_command(EngineCommand::AddModule {
            slot: Box::new(slot),
        });
    }

    fn cable(graph: &mut PatchGraph, id: CableId, from: PortRef, to: PortRef) {
        graph.handle_command(EngineCommand::AddCable { id });
        graph.handle_command(EngineCommand::BindEnd {
            cable: id,
            end: CableEnd::A,
            port: from,
        });
        graph.handle_command(EngineCommand::BindEnd {
            cable: id,
            end: CableEnd::B,
            port: to,
        });
    }

    #[test]
    fn test_empty_graph_is_silent() {
        let mut graph = PatchGraph::new(44100.0);
        assert_eq!(graph.tick(), 0.0);
    }

    #[test]
    fn test_no_sink_is_silent() {
        let mut graph = PatchGraph::new(44100.0);
        add::<ConstSource>(&mut graph, 1);
        graph.handle_command(EngineCommand::SetParameter {
            module: 1,
            param_index: 0,
            value: 0.5,
        });
        assert_eq!(graph.tick(), 0.0);
        assert_eq!(graph.module_output(1, 0), Some(0.5));
    }

    #[test]
    fn test_forward_connection_is_zero_latency() {
        let mut graph = PatchGraph::new(44100.0);
        add::<ConstSource>(&mut graph, 1);
        add::<TestSink>(&mut graph, 2);
        graph.handle_command(EngineCommand::SetParameter {
            module: 1,
            param_index: 0,
            value: 0.75,
        });
        graph.handle_command(EngineCommand::DesignateSink { module: 2 });
        cable(&mut graph, 10, PortRef::output(1, 0), PortRef::input(2, 0));

        // The sink comes after the source in pass order, so the very
        // first tick already carries the fresh value.
        assert_eq!(graph.tick(), 0.75);
    }

    #[test]
    fn test_backward_connection_is_one_sample_late() {
        let mut graph = PatchGraph::new(44100.0);
        // The adder sits before the source, so it reads the source's
        // previous-tick output.
        add::<AddOne>(&mut graph, 1);
        add::<ConstSource>(&mut graph, 2);
        graph.handle_command(EngineCommand::SetParameter {
            module: 2,
            param_index: 0,
            value: 0.5,
        });
        cable(&mut graph, 10, PortRef::output(2, 0), PortRef::input(1, 0));

        graph.tick();
        // First tick: the source had not run yet, adder saw 0.0.
        assert_eq!(graph.module_output(1, 0), Some(1.0));
        graph.tick();
        assert_eq!(graph.module_output(1, 0), Some(1.5));
    }

    #[test]
    fn test_self_feedback_counts_without_deadlock() {
        let mut graph = PatchGraph::new(44100.0);
        add::<AddOne>(&mut graph, 1);
        cable(&mut graph, 10, PortRef::output(1, 0), PortRef::input(1, 0));

        for expected in 1..=5 {
            graph.tick();
            assert_eq!(graph.module_output(1, 0), Some(expected as f32));
        }
    }

    #[test]
    fn test_unpatched_input_reads_silence() {
        let mut graph = PatchGraph::new(44100.0);
        add::<AddOne>(&mut graph, 1);
        graph.tick();
        assert_eq!(graph.module_output(1, 0), Some(1.0));
    }

    #[test]
    fn test_dangling_cable_reads_silence() {
        let mut graph = PatchGraph::new(44100.0);
        add::<ConstSource>(&mut graph, 1);
        add::<AddOne>(&mut graph, 2);
        graph.handle_command(EngineCommand::SetParameter {
            module: 1,
            param_index: 0,
            value: 0.5,
        });
        // One end in the adder's input, the other unplugged.
        graph.handle_command(EngineCommand::AddCable { id: 10 });
        graph.handle_command(EngineCommand::BindEnd {
            cable: 10,
            end: CableEnd::A,
            port: PortRef::input(2, 0),
        });

        graph.tick();
        assert_eq!(graph.module_output(2, 0), Some(1.0));
    }

    #[test]
    fn test_binding_steals_prior_binding() {
        let mut graph = PatchGraph::new(44100.0);
        add::<ConstSource>(&mut graph, 1);
        add::<ConstSource>(&mut graph, 2);
        add::<TestSink>(&mut graph, 3);
        graph.handle_command(EngineCommand::SetParameter {
            module: 1,
            param_index: 0,
            value: 0.25,
        });
        graph.handle_command(EngineCommand::SetParameter {
            module: 2,
            param_index: 0,
            value: 0.75,
        });
        graph.handle_command(EngineCommand::DesignateSink { module: 3 });

        cable(&mut graph, 10, PortRef::output(1, 0), PortRef::input(3, 0));
        assert_eq!(graph.tick(), 0.25);

        // Plugging a second cable into the same input unbinds the first.
        cable(&mut graph, 11, PortRef::output(2, 0), PortRef::input(3, 0));
        assert_eq!(graph.tick(), 0.75);

        let ends = graph.cable_ends(10).unwrap();
        assert_eq!(ends[1], None, "stolen end should be unbound");
        assert_eq!(ends[0], Some(PortRef::output(1, 0)));
    }

    #[test]
    fn test_cable_removal_silences_input() {
        let mut graph = PatchGraph::new(44100.0);
        add::<ConstSource>(&mut graph, 1);
        add::<TestSink>(&mut graph, 2);
        graph.handle_command(EngineCommand::SetParameter {
            module: 1,
            param_index: 0,
            value: 0.5,
        });
        graph.handle_command(EngineCommand::DesignateSink { module: 2 });
        cable(&mut graph, 10, PortRef::output(1, 0), PortRef::input(2, 0));

        assert_eq!(graph.tick(), 0.5);
        graph.handle_command(EngineCommand::RemoveCable { id: 10 });
        assert_eq!(graph.tick(), 0.0);
        assert_eq!(graph.cable_count(), 0);
    }

    #[test]
    fn test_module_removal_detaches_cables_and_purges_at_boundary() {
        let mut graph = PatchGraph::new(44100.0);
        add::<ConstSource>(&mut graph, 1);
        add::<TestSink>(&mut graph, 2);
        graph.handle_command(EngineCommand::SetParameter {
            module: 1,
            param_index: 0,
            value: 0.5,
        });
        graph.handle_command(EngineCommand::DesignateSink { module: 2 });
        cable(&mut graph, 10, PortRef::output(1, 0), PortRef::input(2, 0));

        graph.handle_command(EngineCommand::RemoveModule { id: 1 });
        // Cable stays but both references to the module are gone.
        let ends = graph.cable_ends(10).unwrap();
        assert_eq!(ends[0], None);
        // Flagged slot still ticks until the boundary purge.
        assert_eq!(graph.module_count(), 2);
        assert_eq!(graph.tick(), 0.0);

        let mut disposed = Vec::new();
        graph.apply_pending_removals(|slot| disposed.push(slot.id));
        assert_eq!(disposed, vec![1]);
        assert_eq!(graph.module_count(), 1);
    }

    #[test]
    fn test_sink_purge_clears_designation() {
        let mut graph = PatchGraph::new(44100.0);
        add::<TestSink>(&mut graph, 1);
        graph.handle_command(EngineCommand::DesignateSink { module: 1 });
        assert_eq!(graph.sink(), Some(1));

        graph.handle_command(EngineCommand::RemoveModule { id: 1 });
        graph.apply_pending_removals(|_| {});
        assert_eq!(graph.sink(), None);
        assert_eq!(graph.tick(), 0.0);
    }

    #[test]
    fn test_parameter_clamps_in_graph() {
        let mut graph = PatchGraph::new(44100.0);
        add::<ConstSource>(&mut graph, 1);
        graph.handle_command(EngineCommand::SetParameter {
            module: 1,
            param_index: 0,
            value: 9.0,
        });
        graph.tick();
        assert_eq!(graph.module_output(1, 0), Some(1.0));
    }

    #[test]
    fn test_stale_commands_are_ignored() {
        let mut graph = PatchGraph::new(44100.0);
        graph.handle_command(EngineCommand::RemoveModule { id: 99 });
        graph.handle_command(EngineCommand::SetParameter {
            module: 99,
            param_index: 0,
            value: 0.5,
        });
        graph.handle_command(EngineCommand::DesignateSink { module: 99 });
        graph.handle_command(EngineCommand::UnbindEnd {
            cable: 99,
            end: CableEnd::A,
        });
        assert_eq!(graph.module_count(), 0);
        assert_eq!(graph.sink(), None);
        assert_eq!(graph.tick(), 0.0);
    }

    #[test]
    fn test_output_to_output_cable_carries_nothing() {
        let mut graph = PatchGraph::new(44100.0);
        add::<ConstSource>(&mut graph, 1);
        add::<AddOne>(&mut graph, 2);
        graph.handle_command(EngineCommand::SetParameter {
            module: 1,
            param_index: 0,
            value: 0.5,
        });
        // Both ends on outputs: no input anywhere resolves through it.
        cable(&mut graph, 10, PortRef::output(1, 0), PortRef::output(2, 0));
        graph.tick();
        assert_eq!(graph.module_output(2, 0), Some(1.0));
    }
}
