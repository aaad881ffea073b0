//! The control surface.
//!
//! `PatchController` is the interactive face of the engine: it validates
//! every structural operation against a control-side mirror of the patch,
//! queues the resulting commands for the audio callback, and mirrors the
//! telemetry flowing back (peaks, deadline misses, scope displays,
//! discarded module storage). Nothing here ever blocks on the audio
//! thread.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use rtrb::Consumer;

use crate::dsp::{ModuleInfo, ModuleRegistry, ParameterDefinition, PortDefinition};

use super::channels::ControlHandle;
use super::commands::{CableEnd, CableId, EngineCommand, EngineEvent, ModuleId, PortRef};
use super::graph::ModuleSlot;

/// Samples a scope display window holds.
pub const SCOPE_WINDOW: usize = 65;

/// Errors from invalid control-surface operations.
///
/// All of these leave the patch untouched; the graph never sees the
/// rejected command.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralError {
    /// No module kind with this ID is registered.
    UnknownKind(String),
    /// No module with this handle exists.
    UnknownModule(ModuleId),
    /// No cable with this handle exists.
    UnknownCable(CableId),
    /// The module has no parameter with this ID.
    UnknownParameter(String),
    /// The port index is outside the module's declared ports.
    PortOutOfRange(PortRef),
    /// The module has no display buffer.
    NotAScope(ModuleId),
    /// The command queue is full; retry after the next audio callback.
    EngineBusy,
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralError::UnknownKind(kind) => write!(f, "Unknown module kind '{}'", kind),
            StructuralError::UnknownModule(id) => write!(f, "Unknown module {}", id),
            StructuralError::UnknownCable(id) => write!(f, "Unknown cable {}", id),
            StructuralError::UnknownParameter(id) => write!(f, "Unknown parameter '{}'", id),
            StructuralError::PortOutOfRange(port) => write!(
                f,
                "Module {} has no {} port {}",
                port.module,
                port.direction.name(),
                port.index
            ),
            StructuralError::NotAScope(id) => {
                write!(f, "Module {} has no display buffer", id)
            }
            StructuralError::EngineBusy => write!(f, "Command queue is full"),
        }
    }
}

impl std::error::Error for StructuralError {}

/// Control-side mirror of one module.
struct ModuleShadow {
    kind: &'static str,
    name: String,
    ports: Vec<PortDefinition>,
    params: Vec<ParameterDefinition>,
    values: Vec<f32>,
    is_sink: bool,
    tap: Option<Consumer<f32>>,
    display: VecDeque<f32>,
}

/// The interactive control surface over the running engine.
pub struct PatchController {
    handle: ControlHandle,
    registry: ModuleRegistry,
    sample_rate: f32,
    next_module_id: ModuleId,
    next_cable_id: CableId,
    modules: HashMap<ModuleId, ModuleShadow>,
    cables: HashMap<CableId, [Option<PortRef>; 2]>,
    sink: Option<ModuleId>,
    peak: f32,
    deadline_misses: u64,
}

impl PatchController {
    /// Creates a controller over the control side of the engine channels.
    pub fn new(registry: ModuleRegistry, sample_rate: f32, handle: ControlHandle) -> Self {
        Self {
            handle,
            registry,
            sample_rate,
            next_module_id: 1,
            next_cable_id: 1,
            modules: HashMap::new(),
            cables: HashMap::new(),
            sink: None,
            peak: 0.0,
            deadline_misses: 0,
        }
    }

    /// The catalog of module kinds available to `create_module`.
    pub fn available_modules(&self) -> &[ModuleInfo] {
        self.registry.list_modules()
    }

    /// Instantiates a module kind and inserts it at the end of the pass
    /// order. `initial` sets named parameters before the first tick; the
    /// values clamp to each parameter's range.
    ///
    /// The first sink-flavored module created becomes the designated sink
    /// automatically.
    pub fn create_module(
        &mut self,
        kind: &str,
        initial: &[(&str, f32)],
    ) -> Result<ModuleId, StructuralError> {
        let mut module = self
            .registry
            .create(kind)
            .ok_or_else(|| StructuralError::UnknownKind(kind.to_string()))?;

        let params: Vec<ParameterDefinition> = module.parameters().to_vec();
        let mut values: Vec<f32> = params.iter().map(|p| p.default).collect();
        for (param_id, value) in initial {
            let idx = params
                .iter()
                .position(|p| p.id == *param_id)
                .ok_or_else(|| StructuralError::UnknownParameter(param_id.to_string()))?;
            values[idx] = params[idx].clamp(*value);
        }

        let tap = module.take_display_tap();
        let ports = module.ports().to_vec();
        let info = module.info().clone();
        let is_sink = module.is_sink();

        let id = self.next_module_id;
        let mut slot = ModuleSlot::new(id, module, self.sample_rate);
        slot.params.copy_from_slice(&values);

        self.handle
            .send_command(EngineCommand::AddModule {
                slot: Box::new(slot),
            })
            .map_err(|_| StructuralError::EngineBusy)?;
        self.next_module_id += 1;

        if is_sink && self.sink.is_none() {
            match self.handle.send_command(EngineCommand::DesignateSink { module: id }) {
                Ok(()) => self.sink = Some(id),
                Err(_) => log::warn!("command queue full, sink {} not designated", id),
            }
        }

        self.modules.insert(
            id,
            ModuleShadow {
                kind: info.id,
                name: info.name.to_string(),
                ports,
                params,
                values,
                is_sink,
                tap,
                display: VecDeque::with_capacity(SCOPE_WINDOW + 1),
            },
        );
        Ok(id)
    }

    /// Removes a module. Its cables stay in the patch with the affected
    /// ends unbound; the slot itself is purged at the next buffer boundary
    /// and its storage returns through the deferred-drop ring.
    pub fn destroy_module(&mut self, id: ModuleId) -> Result<(), StructuralError> {
        if !self.modules.contains_key(&id) {
            return Err(StructuralError::UnknownModule(id));
        }
        self.handle
            .send_command(EngineCommand::RemoveModule { id })
            .map_err(|_| StructuralError::EngineBusy)?;

        self.modules.remove(&id);
        for ends in self.cables.values_mut() {
            for end in ends.iter_mut() {
                if end.map(|p| p.module) == Some(id) {
                    *end = None;
                }
            }
        }
        if self.sink == Some(id) {
            self.sink = None;
        }
        Ok(())
    }

    /// Adds a dangling cable.
    pub fn create_cable(&mut self) -> Result<CableId, StructuralError> {
        let id = self.next_cable_id;
        self.handle
            .send_command(EngineCommand::AddCable { id })
            .map_err(|_| StructuralError::EngineBusy)?;
        self.next_cable_id += 1;
        self.cables.insert(id, [None, None]);
        Ok(id)
    }

    /// Removes a cable entirely.
    pub fn destroy_cable(&mut self, id: CableId) -> Result<(), StructuralError> {
        if !self.cables.contains_key(&id) {
            return Err(StructuralError::UnknownCable(id));
        }
        self.handle
            .send_command(EngineCommand::RemoveCable { id })
            .map_err(|_| StructuralError::EngineBusy)?;
        self.cables.remove(&id);
        Ok(())
    }

    /// Plugs one end of a cable into a port. If another cable end already
    /// holds the port, that binding is stolen.
    pub fn bind(
        &mut self,
        cable: CableId,
        end: CableEnd,
        port: PortRef,
    ) -> Result<(), StructuralError> {
        if !self.cables.contains_key(&cable) {
            return Err(StructuralError::UnknownCable(cable));
        }
        let shadow = self
            .modules
            .get(&port.module)
            .ok_or(StructuralError::UnknownModule(port.module))?;
        let count = shadow
            .ports
            .iter()
            .filter(|p| p.direction == port.direction)
            .count();
        if port.index >= count {
            return Err(StructuralError::PortOutOfRange(port));
        }

        self.handle
            .send_command(EngineCommand::BindEnd { cable, end, port })
            .map_err(|_| StructuralError::EngineBusy)?;

        for ends in self.cables.values_mut() {
            for e in ends.iter_mut() {
                if *e == Some(port) {
                    *e = None;
                }
            }
        }
        if let Some(ends) = self.cables.get_mut(&cable) {
            ends[end.index()] = Some(port);
        }
        Ok(())
    }

    /// Unplugs one end of a cable, leaving it dangling.
    pub fn unbind(&mut self, cable: CableId, end: CableEnd) -> Result<(), StructuralError> {
        if !self.cables.contains_key(&cable) {
            return Err(StructuralError::UnknownCable(cable));
        }
        self.handle
            .send_command(EngineCommand::UnbindEnd { cable, end })
            .map_err(|_| StructuralError::EngineBusy)?;
        if let Some(ends) = self.cables.get_mut(&cable) {
            ends[end.index()] = None;
        }
        Ok(())
    }

    /// Sets a named parameter, clamped to its declared range.
    pub fn set_parameter(
        &mut self,
        id: ModuleId,
        param: &str,
        value: f32,
    ) -> Result<(), StructuralError> {
        let shadow = self
            .modules
            .get_mut(&id)
            .ok_or(StructuralError::UnknownModule(id))?;
        let idx = shadow
            .params
            .iter()
            .position(|p| p.id == param)
            .ok_or_else(|| StructuralError::UnknownParameter(param.to_string()))?;
        let clamped = shadow.params[idx].clamp(value);

        self.handle
            .send_command(EngineCommand::SetParameter {
                module: id,
                param_index: idx,
                value: clamped,
            })
            .map_err(|_| StructuralError::EngineBusy)?;
        shadow.values[idx] = clamped;
        Ok(())
    }

    /// Reads back a named parameter's current value.
    pub fn parameter(&self, id: ModuleId, param: &str) -> Result<f32, StructuralError> {
        let shadow = self
            .modules
            .get(&id)
            .ok_or(StructuralError::UnknownModule(id))?;
        let idx = shadow
            .params
            .iter()
            .position(|p| p.id == param)
            .ok_or_else(|| StructuralError::UnknownParameter(param.to_string()))?;
        Ok(shadow.values[idx])
    }

    /// Selects the module whose resolved input becomes the engine output.
    pub fn designate_sink(&mut self, id: ModuleId) -> Result<(), StructuralError> {
        if !self.modules.contains_key(&id) {
            return Err(StructuralError::UnknownModule(id));
        }
        self.handle
            .send_command(EngineCommand::DesignateSink { module: id })
            .map_err(|_| StructuralError::EngineBusy)?;
        self.sink = Some(id);
        Ok(())
    }

    /// Gives a module a user-facing name.
    pub fn rename_module(&mut self, id: ModuleId, name: &str) -> Result<(), StructuralError> {
        let shadow = self
            .modules
            .get_mut(&id)
            .ok_or(StructuralError::UnknownModule(id))?;
        shadow.name = name.to_string();
        Ok(())
    }

    /// A module's current user-facing name.
    pub fn module_name(&self, id: ModuleId) -> Result<&str, StructuralError> {
        self.modules
            .get(&id)
            .map(|s| s.name.as_str())
            .ok_or(StructuralError::UnknownModule(id))
    }

    /// A module's kind ID.
    pub fn module_kind(&self, id: ModuleId) -> Result<&'static str, StructuralError> {
        self.modules
            .get(&id)
            .map(|s| s.kind)
            .ok_or(StructuralError::UnknownModule(id))
    }

    /// Whether a module is sink-flavored.
    pub fn is_sink_module(&self, id: ModuleId) -> Result<bool, StructuralError> {
        self.modules
            .get(&id)
            .map(|s| s.is_sink)
            .ok_or(StructuralError::UnknownModule(id))
    }

    /// The currently designated sink.
    pub fn sink(&self) -> Option<ModuleId> {
        self.sink
    }

    /// Drains engine telemetry: events, discarded module storage, and
    /// scope taps. Call regularly from the control loop.
    pub fn poll(&mut self) {
        while let Some(event) = self.handle.recv_event() {
            match event {
                EngineEvent::OutputPeak(peak) => self.peak = peak,
                EngineEvent::DeadlineMissed { frames_dropped } => {
                    self.deadline_misses += 1;
                    log::warn!("audio deadline missed, {} frames padded", frames_dropped);
                }
            }
        }
        self.handle.collect_garbage();
        for shadow in self.modules.values_mut() {
            if let Some(tap) = &mut shadow.tap {
                while let Ok(sample) = tap.pop() {
                    shadow.display.push_back(sample);
                    if shadow.display.len() > SCOPE_WINDOW {
                        shadow.display.pop_front();
                    }
                }
            }
        }
    }

    /// The most recent display window of a scope module, oldest first.
    pub fn display_buffer(&mut self, id: ModuleId) -> Result<&[f32], StructuralError> {
        let shadow = self
            .modules
            .get_mut(&id)
            .ok_or(StructuralError::UnknownModule(id))?;
        let Some(tap) = &mut shadow.tap else {
            return Err(StructuralError::NotAScope(id));
        };
        while let Ok(sample) = tap.pop() {
            shadow.display.push_back(sample);
            if shadow.display.len() > SCOPE_WINDOW {
                shadow.display.pop_front();
            }
        }
        Ok(shadow.display.make_contiguous())
    }

    /// Last reported output peak.
    pub fn output_peak(&self) -> f32 {
        self.peak
    }

    /// Count of deadline misses reported so far.
    pub fn deadline_misses(&self) -> u64 {
        self.deadline_misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::audio_processor::builtin_registry;
    use crate::engine::channels::{EngineChannels, EngineHandle};
    use crate::engine::graph::PatchGraph;

    fn pair() -> (PatchController, EngineHandle) {
        let (control, engine) = EngineChannels::with_defaults().split();
        (
            PatchController::new(builtin_registry(), 44100.0, control),
            engine,
        )
    }

    fn pump(graph: &mut PatchGraph, engine: &mut EngineHandle) {
        while let Some(cmd) = engine.recv_command() {
            graph.handle_command(cmd);
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let (mut controller, _engine) = pair();
        let err = controller.create_module("no.such.kind", &[]);
        assert!(matches!(err, Err(StructuralError::UnknownKind(_))));
    }

    #[test]
    fn test_unknown_initial_parameter_is_rejected() {
        let (mut controller, _engine) = pair();
        let err = controller.create_module("util.mixer", &[("bogus", 0.5)]);
        assert!(matches!(err, Err(StructuralError::UnknownParameter(_))));
    }

    #[test]
    fn test_parameter_clamps_at_control_surface() {
        let (mut controller, _engine) = pair();
        let mixer = controller.create_module("util.mixer", &[]).unwrap();

        controller.set_parameter(mixer, "volume", 7.0).unwrap();
        assert_eq!(controller.parameter(mixer, "volume").unwrap(), 1.0);

        controller.set_parameter(mixer, "volume", -7.0).unwrap();
        assert_eq!(controller.parameter(mixer, "volume").unwrap(), -1.0);
    }

    #[test]
    fn test_bind_validates_ports() {
        let (mut controller, _engine) = pair();
        let mixer = controller.create_module("util.mixer", &[]).unwrap();
        let cable = controller.create_cable().unwrap();

        // Mixer has two inputs and one output.
        let err = controller.bind(cable, CableEnd::A, PortRef::input(mixer, 5));
        assert!(matches!(err, Err(StructuralError::PortOutOfRange(_))));
        let err = controller.bind(cable, CableEnd::A, PortRef::output(mixer, 1));
        assert!(matches!(err, Err(StructuralError::PortOutOfRange(_))));

        assert!(controller
            .bind(cable, CableEnd::A, PortRef::output(mixer, 0))
            .is_ok());
    }

    #[test]
    fn test_stale_handles_are_rejected() {
        let (mut controller, _engine) = pair();
        assert!(matches!(
            controller.destroy_module(42),
            Err(StructuralError::UnknownModule(42))
        ));
        assert!(matches!(
            controller.destroy_cable(42),
            Err(StructuralError::UnknownCable(42))
        ));
        assert!(matches!(
            controller.unbind(42, CableEnd::A),
            Err(StructuralError::UnknownCable(42))
        ));
        assert!(matches!(
            controller.set_parameter(42, "volume", 0.0),
            Err(StructuralError::UnknownModule(42))
        ));
    }

    #[test]
    fn test_first_sink_is_designated_automatically() {
        let (mut controller, _engine) = pair();
        assert_eq!(controller.sink(), None);

        let mixer = controller.create_module("util.mixer", &[]).unwrap();
        assert_eq!(controller.sink(), None);
        assert!(!controller.is_sink_module(mixer).unwrap());

        let out = controller.create_module("out.main", &[]).unwrap();
        assert_eq!(controller.sink(), Some(out));
        assert!(controller.is_sink_module(out).unwrap());
    }

    #[test]
    fn test_rename_module() {
        let (mut controller, _engine) = pair();
        let mixer = controller.create_module("util.mixer", &[]).unwrap();
        assert_eq!(controller.module_name(mixer).unwrap(), "Mixer");

        controller.rename_module(mixer, "drums bus").unwrap();
        assert_eq!(controller.module_name(mixer).unwrap(), "drums bus");
        assert_eq!(controller.module_kind(mixer).unwrap(), "util.mixer");
    }

    /// An envelope with instant attack/decay, full sustain, and the
    /// trigger button held emits a constant 1.0 from its second tick on.
    const HELD_ENVELOPE: &[(&str, f32)] = &[
        ("attack", -1.0),
        ("decay", -1.0),
        ("sustain", 1.0),
        ("trigger", 1.0),
    ];

    #[test]
    fn test_controller_drives_graph() {
        let (mut controller, mut engine) = pair();
        let mut graph = PatchGraph::new(44100.0);

        let env = controller
            .create_module("env.adsr", HELD_ENVELOPE)
            .unwrap();
        let mixer = controller
            .create_module("util.mixer", &[("volume", 0.5)])
            .unwrap();
        let out = controller.create_module("out.main", &[]).unwrap();

        let first = controller.create_cable().unwrap();
        controller
            .bind(first, CableEnd::A, PortRef::output(env, 0))
            .unwrap();
        controller
            .bind(first, CableEnd::B, PortRef::input(mixer, 0))
            .unwrap();
        let second = controller.create_cable().unwrap();
        controller
            .bind(second, CableEnd::A, PortRef::output(mixer, 0))
            .unwrap();
        controller
            .bind(second, CableEnd::B, PortRef::input(out, 0))
            .unwrap();

        pump(&mut graph, &mut engine);
        assert_eq!(graph.sink(), Some(out));
        // The envelope sees its trigger edge on the first tick and holds
        // full sustain after; the mixer halves it.
        assert_eq!(graph.tick(), 0.0);
        assert_eq!(graph.tick(), 0.5);
    }

    #[test]
    fn test_scope_display_reaches_controller() {
        let (mut controller, mut engine) = pair();
        let mut graph = PatchGraph::new(44100.0);

        let env = controller
            .create_module("env.adsr", HELD_ENVELOPE)
            .unwrap();
        let mixer = controller
            .create_module("util.mixer", &[("volume", 0.25)])
            .unwrap();
        let scope = controller.create_module("util.scope", &[]).unwrap();

        let first = controller.create_cable().unwrap();
        controller
            .bind(first, CableEnd::A, PortRef::output(env, 0))
            .unwrap();
        controller
            .bind(first, CableEnd::B, PortRef::input(mixer, 0))
            .unwrap();
        let second = controller.create_cable().unwrap();
        controller
            .bind(second, CableEnd::A, PortRef::output(mixer, 0))
            .unwrap();
        controller
            .bind(second, CableEnd::B, PortRef::input(scope, 0))
            .unwrap();

        pump(&mut graph, &mut engine);
        // Rate knob at 0 captures every 10th tick; the envelope holds
        // 1.0 from tick two, so both captures see the mixed level.
        for _ in 0..20 {
            graph.tick();
        }

        let display = controller.display_buffer(scope).unwrap();
        assert_eq!(display, &[0.25, 0.25]);
    }

    #[test]
    fn test_display_buffer_requires_scope() {
        let (mut controller, _engine) = pair();
        let mixer = controller.create_module("util.mixer", &[]).unwrap();
        assert!(matches!(
            controller.display_buffer(mixer),
            Err(StructuralError::NotAScope(_))
        ));
    }

    #[test]
    fn test_destroy_module_unbinds_mirrored_cables() {
        let (mut controller, mut engine) = pair();
        let mut graph = PatchGraph::new(44100.0);

        let mixer = controller.create_module("util.mixer", &[]).unwrap();
        let out = controller.create_module("out.main", &[]).unwrap();
        let cable = controller.create_cable().unwrap();
        controller
            .bind(cable, CableEnd::A, PortRef::output(mixer, 0))
            .unwrap();
        controller
            .bind(cable, CableEnd::B, PortRef::input(out, 0))
            .unwrap();

        controller.destroy_module(mixer).unwrap();
        assert!(matches!(
            controller.set_parameter(mixer, "volume", 0.0),
            Err(StructuralError::UnknownModule(_))
        ));

        pump(&mut graph, &mut engine);
        let ends = graph.cable_ends(cable).unwrap();
        assert_eq!(ends[0], None);
        assert_eq!(ends[1], Some(PortRef::input(out, 0)));
    }

    #[test]
    fn test_engine_busy_when_queue_full() {
        let (control, _engine) = EngineChannels::new(1, 1, 1).split();
        let mut controller = PatchController::new(builtin_registry(), 44100.0, control);

        controller.create_cable().unwrap();
        let err = controller.create_cable();
        assert!(matches!(err, Err(StructuralError::EngineBusy)));
        // The failed cable must not linger in the mirror.
        assert!(matches!(
            controller.destroy_cable(2),
            Err(StructuralError::UnknownCable(2))
        ));
    }
}
