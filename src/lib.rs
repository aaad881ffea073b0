//! Modsynth
//!
//! Core engine for a patch-cable modular synthesizer: the port and cable
//! model, the per-sample patch graph, the DSP module catalog, and the
//! lock-free bridge between the control thread and the audio callback.

pub mod dsp;
pub mod engine;
pub mod modules;
