//! Engine module.
//!
//! The audio side of the synthesizer: the patch graph, the command and
//! event rings, the cpal stream, and the control surface that drives it
//! all from the interactive thread.

pub mod audio_engine;
pub mod audio_processor;
pub mod channels;
pub mod commands;
pub mod controller;
pub mod graph;

pub use audio_engine::{AudioEngine, AudioError};
pub use audio_processor::{builtin_registry, AudioProcessor};
pub use channels::{ControlHandle, EngineChannels, EngineHandle};
pub use commands::{CableEnd, CableId, EngineCommand, EngineEvent, ModuleId, PortIndex, PortRef};
pub use controller::{PatchController, StructuralError, SCOPE_WINDOW};
pub use graph::{ModuleSlot, PatchGraph, MAX_PORTS};

/// Brings up the whole engine: opens the default output device, wires the
/// channel rings, starts the stream, and returns the running engine with
/// its control surface.
pub fn start() -> Result<(AudioEngine, PatchController), AudioError> {
    let mut engine = AudioEngine::new()?;
    let sample_rate = engine.sample_rate() as f32;

    let (control, audio) = EngineChannels::with_defaults().split();
    let processor = AudioProcessor::new(sample_rate, audio);
    let controller = PatchController::new(builtin_registry(), sample_rate, control);

    engine.start(processor)?;
    Ok((engine, controller))
}
