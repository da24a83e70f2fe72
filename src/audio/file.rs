use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::resampler::resample_pcm;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            bail!(
                "Unsupported WAV format: {}-bit {:?} (expected 16-bit PCM)",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Convert to the capture format: remix channels first, then resample
    pub fn converted(self, target_rate: u32, target_channels: u16) -> Result<AudioFile> {
        if self.sample_rate == target_rate && self.channels == target_channels {
            return Ok(self);
        }

        let remixed = AudioFrame {
            samples: self.samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms: 0,
        }
        .remix(target_channels)
        .with_context(|| format!("Unsupported channel layout in {}", self.path))?;

        let samples = resample_pcm(
            &remixed.samples,
            self.sample_rate,
            target_rate,
            target_channels,
        )
        .with_context(|| format!("Failed to resample {}", self.path))?;

        let duration_seconds =
            samples.len() as f64 / (target_rate as f64 * target_channels as f64);

        info!(
            "Converted {}: {}Hz/{}ch -> {}Hz/{}ch ({:.2}s)",
            self.path,
            self.sample_rate,
            self.channels,
            target_rate,
            target_channels,
            duration_seconds
        );

        Ok(AudioFile {
            path: self.path,
            duration_seconds,
            sample_rate: target_rate,
            channels: target_channels,
            samples,
        })
    }

    /// Split into frames of `buffer_ms` in the file's own format
    pub fn frames(&self, buffer_ms: u64) -> Vec<AudioFrame> {
        let per_buffer = ((self.sample_rate as u64 * self.channels as u64 * buffer_ms) / 1000)
            .max(self.channels as u64) as usize;

        self.samples
            .chunks(per_buffer)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: i as u64 * buffer_ms,
            })
            .collect()
    }
}

/// Replays a WAV file as if it were being captured live
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: AudioBackendConfig) -> Self {
        Self {
            path,
            config,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            bail!("Already capturing");
        }

        let frames = AudioFile::open(&self.path)?
            .converted(self.config.target_sample_rate, self.config.target_channels)?
            .frames(self.config.buffer_duration_ms);
        let (tx, rx) = mpsc::channel(100);

        self.task = Some(tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        // The file is finite: wait for every frame to be handed over
        if let Some(task) = self.task.take() {
            task.await.context("File replay task panicked")?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "file"
    }
}
