//! Modules module
//!
//! The built-in module catalog: oscillator, envelope, delay, bit crusher,
//! mixer, scope, and the speaker output.

pub mod bitcrusher;
pub mod delay;
pub mod envelope;
pub mod mixer;
pub mod oscillator;
pub mod output;
pub mod scope;

// Re-export commonly used types
pub use bitcrusher::BitCrusher;
pub use delay::DelayLine;
pub use envelope::AdsrEnvelope;
pub use mixer::Mixer;
pub use oscillator::WaveOscillator;
pub use output::AudioOut;
pub use scope::Scope;
