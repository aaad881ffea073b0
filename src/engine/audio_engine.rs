//! Audio engine.
//!
//! Owns the cpal output stream. The audio processor is moved whole into
//! the callback closure, so the callback touches no shared state and
//! acquires no locks.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::audio_processor::AudioProcessor;

/// Errors that can occur during audio engine operation.
#[derive(Debug, Clone)]
pub enum AudioError {
    /// No audio output device was found.
    NoOutputDevice,
    /// Failed to get device configuration.
    ConfigurationFailed(String),
    /// Failed to create the audio stream.
    StreamCreationFailed(String),
    /// Failed to start/stop playback.
    StreamPlaybackFailed(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::NoOutputDevice => write!(f, "No audio output device found"),
            AudioError::ConfigurationFailed(msg) => {
                write!(f, "Failed to get device configuration: {}", msg)
            }
            AudioError::StreamCreationFailed(msg) => {
                write!(f, "Failed to create audio stream: {}", msg)
            }
            AudioError::StreamPlaybackFailed(msg) => {
                write!(f, "Failed to control audio playback: {}", msg)
            }
        }
    }
}

impl std::error::Error for AudioError {}

/// Manages the cpal output stream.
pub struct AudioEngine {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl AudioEngine {
    /// Creates an engine over the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::ConfigurationFailed(e.to_string()))?;

        let sample_rate = supported_config.sample_rate().0;
        let config = StreamConfig {
            channels: supported_config.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        log::info!(
            "audio device '{}', {} Hz, {} channels",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            config.channels
        );

        Ok(Self {
            device,
            config,
            stream: None,
        })
    }

    /// The device sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// The number of output channels.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Starts the stream, moving the processor into the callback.
    pub fn start(&mut self, mut processor: AudioProcessor) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    processor.process(data, channels);
                },
                move |err| {
                    log::error!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamCreationFailed(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlaybackFailed(e.to_string()))?;

        self.stream = Some(stream);
        Ok(())
    }

    /// Stops and drops the stream.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| AudioError::StreamPlaybackFailed(e.to_string()))?;
        }
        Ok(())
    }

    /// Whether the stream is currently running.
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}
