//! Parameter definitions for DSP modules.
//!
//! Parameters are the front-panel controls: bipolar knobs in [-1, 1] and
//! momentary buttons in {0, 1}. Writes outside the declared range clamp
//! silently.

/// The physical flavor of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    /// Continuous bipolar knob.
    Knob,
    /// Momentary or latching button.
    Button,
}

impl ParameterKind {
    /// Returns a human-readable name for the kind.
    pub fn name(&self) -> &'static str {
        match self {
            ParameterKind::Knob => "Knob",
            ParameterKind::Button => "Button",
        }
    }
}

/// Definition of a parameter on a DSP module.
///
/// The parameter's position in the module's declaration order is the index
/// used in the `params` slice handed to `advance`.
#[derive(Clone, Debug)]
pub struct ParameterDefinition {
    /// Unique identifier for this parameter within the module.
    pub id: &'static str,
    /// Human-readable label.
    pub name: &'static str,
    /// Minimum value of the parameter.
    pub min: f32,
    /// Maximum value of the parameter.
    pub max: f32,
    /// Value the module starts with.
    pub default: f32,
    /// Knob or button.
    pub kind: ParameterKind,
}

impl ParameterDefinition {
    /// Creates a bipolar knob centered at 0.
    pub fn knob(id: &'static str, name: &'static str) -> Self {
        Self::knob_at(id, name, 0.0)
    }

    /// Creates a bipolar knob with an explicit starting position.
    pub fn knob_at(id: &'static str, name: &'static str, default: f32) -> Self {
        Self {
            id,
            name,
            min: -1.0,
            max: 1.0,
            default: default.clamp(-1.0, 1.0),
            kind: ParameterKind::Knob,
        }
    }

    /// Creates a button parameter.
    pub fn button(id: &'static str, name: &'static str) -> Self {
        Self {
            id,
            name,
            min: 0.0,
            max: 1.0,
            default: 0.0,
            kind: ParameterKind::Button,
        }
    }

    /// Clamps a value to this parameter's valid range.
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Returns true for button parameters.
    pub fn is_button(&self) -> bool {
        self.kind == ParameterKind::Button
    }
}
