//! Ports and input readings.
//!
//! Ports are the jacks on a module where cables plug in. Inputs never store
//! a value of their own: each tick the graph resolves them against the
//! memoized output on the far side of the cable and hands the module an
//! [`InputReading`].

/// Direction of a port on a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Receives a signal from a cable.
    Input,
    /// Publishes the module's memoized value for this tick.
    Output,
}

impl PortDirection {
    /// Returns a human-readable name for the port direction.
    pub fn name(&self) -> &'static str {
        match self {
            PortDirection::Input => "Input",
            PortDirection::Output => "Output",
        }
    }
}

/// Definition of a port on a DSP module.
///
/// Modules declare their inputs first and their outputs after them; the
/// position within each direction is the index used on the wire.
#[derive(Clone, Debug)]
pub struct PortDefinition {
    /// Unique identifier for this port within the module.
    pub id: &'static str,
    /// Human-readable label.
    pub name: &'static str,
    /// Whether this is an input or output port.
    pub direction: PortDirection,
}

impl PortDefinition {
    /// Creates an input port definition.
    pub fn input(id: &'static str, name: &'static str) -> Self {
        Self {
            id,
            name,
            direction: PortDirection::Input,
        }
    }

    /// Creates an output port definition.
    pub fn output(id: &'static str, name: &'static str) -> Self {
        Self {
            id,
            name,
            direction: PortDirection::Output,
        }
    }

    /// Returns true if this is an input port.
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Returns true if this is an output port.
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}

/// The resolved state of one input port for the current tick.
///
/// An input only counts as patched when a cable at the port leads all the
/// way to an output on a live module; a dangling cable reads the same as no
/// cable at all. The combination helpers implement the three jack flavors:
/// a bare signal jack uses `value` directly, a knob-backed jack multiplies
/// the knob by the signal when patched and falls back to the knob alone
/// otherwise, and a button-backed jack lets the signal override the manual
/// button state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputReading {
    /// The source output's memoized value, or 0.0 when unpatched.
    pub value: f32,
    /// Whether a cable resolves to a live output at this port.
    pub connected: bool,
}

impl InputReading {
    /// Reading for a port with no resolvable cable.
    pub const UNPATCHED: Self = Self {
        value: 0.0,
        connected: false,
    };

    /// Reading for a port patched to a source output.
    pub fn from_source(value: f32) -> Self {
        Self {
            value,
            connected: true,
        }
    }

    /// Knob-backed combination: `knob * signal` when patched, `knob` alone
    /// otherwise.
    pub fn scale(&self, knob: f32) -> f32 {
        if self.connected {
            knob * self.value
        } else {
            knob
        }
    }

    /// Button-backed combination: the patched signal overrides the manual
    /// button state.
    pub fn or_manual(&self, manual: f32) -> f32 {
        if self.connected {
            self.value
        } else {
            manual
        }
    }
}
