use anyhow::{bail, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since recording started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Map to `target_channels`; only mono and stereo convert into each other
    pub fn remix(self, target_channels: u16) -> Result<AudioFrame> {
        match (self.channels, target_channels) {
            (from, to) if from == to => Ok(self),
            (2, 1) => Ok(self.stereo_to_mono()),
            (1, 2) => Ok(self.mono_to_stereo()),
            (from, to) => bail!("Cannot convert {} channels to {}", from, to),
        }
    }

    /// Average left and right channels into one
    pub fn stereo_to_mono(self) -> AudioFrame {
        if self.channels != 2 {
            return self; // Only support stereo -> mono
        }

        let mono_samples = self
            .samples
            .chunks_exact(2)
            .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
            .collect();

        AudioFrame {
            samples: mono_samples,
            sample_rate: self.sample_rate,
            channels: 1,
            timestamp_ms: self.timestamp_ms,
        }
    }

    /// Duplicate a mono signal onto both channels
    pub fn mono_to_stereo(self) -> AudioFrame {
        if self.channels != 1 {
            return self;
        }

        let stereo_samples = self.samples.iter().flat_map(|&s| [s, s]).collect();

        AudioFrame {
            samples: stereo_samples,
            sample_rate: self.sample_rate,
            channels: 2,
            timestamp_ms: self.timestamp_ms,
        }
    }

    /// Duration covered by this frame
    pub fn duration_ms(&self) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / per_second
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (file input is resampled to it)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for speech recognition
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms buffers
        }
    }
}

impl AudioBackendConfig {
    /// Interleaved samples in one buffer
    pub fn samples_per_buffer(&self) -> usize {
        let per_ms = self.target_sample_rate as u64 * self.target_channels as u64;
        ((per_ms * self.buffer_duration_ms) / 1000).max(1) as usize
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: external recorder process streaming raw PCM
/// - File: replay a WAV file (for testing / offline input)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend for a source
    pub fn create(
        source: &AudioSource,
        config: AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone { command } => {
                let backend = super::command::CommandBackend::new(command.clone(), config)?;
                Ok(Box::new(backend))
            }

            AudioSource::File(path) => {
                let backend = super::file::FileBackend::new(path.clone(), config);
                Ok(Box::new(backend))
            }
        }
    }
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Microphone input through a recorder program writing raw S16LE to stdout
    Microphone { command: Vec<String> },
    /// File input (for testing/batch processing)
    File(PathBuf),
}
