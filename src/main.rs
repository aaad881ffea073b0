//! Modular Synth - a patch-cable modular audio synthesizer
//!
//! Entry point: starts the audio engine, wires a small demo patch, and
//! plays it for a few seconds while reporting the output peak.

use std::error::Error;
use std::thread;
use std::time::Duration;

use modsynth::engine::{self, CableEnd, PortRef};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let (engine, mut patch) = engine::start()?;
    log::info!("engine running at {} Hz", engine.sample_rate());

    // Demo patch: oscillator through a half-volume mixer to the speakers.
    let osc = patch.create_module("osc.wave", &[])?;
    let mixer = patch.create_module("util.mixer", &[("volume", 0.5)])?;
    let out = patch.create_module("out.main", &[])?;

    let first = patch.create_cable()?;
    patch.bind(first, CableEnd::A, PortRef::output(osc, 0))?;
    patch.bind(first, CableEnd::B, PortRef::input(mixer, 0))?;

    let second = patch.create_cable()?;
    patch.bind(second, CableEnd::A, PortRef::output(mixer, 0))?;
    patch.bind(second, CableEnd::B, PortRef::input(out, 0))?;

    println!("playing a 440 Hz sine for 10 seconds...");
    for _ in 0..200 {
        patch.poll();
        thread::sleep(Duration::from_millis(50));
    }
    println!("output peak: {:.3}", patch.output_peak());

    Ok(())
}
