//! Engine commands and events.
//!
//! The messages that cross between the control thread and the audio
//! callback. Commands are applied at buffer boundaries, before any tick of
//! the buffer, so the graph never mutates mid-pass.

use crate::dsp::PortDirection;

use super::graph::ModuleSlot;

/// Unique handle for a module instance, allocated by the controller.
pub type ModuleId = u64;

/// Unique handle for a cable, allocated by the controller.
pub type CableId = u64;

/// Index of a port within one direction on a module.
pub type PortIndex = usize;

/// The two ends of a cable. Either end may plug into any port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CableEnd {
    A,
    B,
}

impl CableEnd {
    /// Array index for this end.
    pub fn index(self) -> usize {
        match self {
            CableEnd::A => 0,
            CableEnd::B => 1,
        }
    }

    /// The opposite end of the cable.
    pub fn other(self) -> CableEnd {
        match self {
            CableEnd::A => CableEnd::B,
            CableEnd::B => CableEnd::A,
        }
    }
}

/// Addresses one port on one module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortRef {
    /// The module the port belongs to.
    pub module: ModuleId,
    /// Input or output side.
    pub direction: PortDirection,
    /// Position within that side.
    pub index: PortIndex,
}

impl PortRef {
    /// References an input port.
    pub fn input(module: ModuleId, index: PortIndex) -> Self {
        Self {
            module,
            direction: PortDirection::Input,
            index,
        }
    }

    /// References an output port.
    pub fn output(module: ModuleId, index: PortIndex) -> Self {
        Self {
            module,
            direction: PortDirection::Output,
            index,
        }
    }
}

/// Commands sent from the controller to the audio callback.
///
/// Module storage travels inside `AddModule` already boxed and prepared,
/// so the audio thread never allocates.
#[derive(Debug)]
pub enum EngineCommand {
    /// Insert a fully constructed module slot at the end of the pass order.
    AddModule { slot: Box<ModuleSlot> },

    /// Detach a module's ports and flag it for removal at the next buffer
    /// boundary.
    RemoveModule { id: ModuleId },

    /// Add a cable with both ends unbound.
    AddCable { id: CableId },

    /// Remove a cable entirely.
    RemoveCable { id: CableId },

    /// Plug one end of a cable into a port, stealing any binding the port
    /// already holds.
    BindEnd {
        cable: CableId,
        end: CableEnd,
        port: PortRef,
    },

    /// Unplug one end of a cable.
    UnbindEnd { cable: CableId, end: CableEnd },

    /// Set a parameter value (clamped to the parameter's range).
    SetParameter {
        module: ModuleId,
        param_index: usize,
        value: f32,
    },

    /// Select the module whose input becomes the engine's output.
    DesignateSink { module: ModuleId },
}

/// Events sent from the audio callback to the controller.
#[derive(Clone, Copy, Debug)]
pub enum EngineEvent {
    /// The callback ran out of time; the tail of the buffer was filled
    /// with the last valid sample.
    DeadlineMissed {
        /// Frames that were padded instead of computed.
        frames_dropped: usize,
    },

    /// Recent peak of the produced signal, for metering.
    OutputPeak(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cable_end_indices() {
        assert_eq!(CableEnd::A.index(), 0);
        assert_eq!(CableEnd::B.index(), 1);
        assert_eq!(CableEnd::A.other(), CableEnd::B);
        assert_eq!(CableEnd::B.other(), CableEnd::A);
    }

    #[test]
    fn test_port_ref_constructors() {
        let input = PortRef::input(3, 1);
        assert_eq!(input.module, 3);
        assert_eq!(input.direction, PortDirection::Input);
        assert_eq!(input.index, 1);

        let output = PortRef::output(3, 0);
        assert_eq!(output.direction, PortDirection::Output);
        assert_ne!(input, output);
    }

    #[test]
    fn test_command_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<EngineCommand>();
        assert_send::<EngineEvent>();
    }
}
