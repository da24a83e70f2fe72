use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource,
};
use crate::ports::{CaptureConfig, CaptureService};

/// Microphone capture service that records one WAV file per `start`/`stop`
///
/// Frames from the backend are written to `<output_dir>/<uuid>.wav`. The file
/// belongs to the caller once `stop` returns it; `cancel` deletes it.
pub struct WavRecorder {
    source: AudioSource,
    output_dir: PathBuf,
    active: Option<ActiveRecording>,
}

struct ActiveRecording {
    backend: Box<dyn AudioBackend>,
    path: PathBuf,
    writer: JoinHandle<Result<usize>>,
}

impl WavRecorder {
    pub fn new(source: AudioSource, output_dir: PathBuf) -> Self {
        Self {
            source,
            output_dir,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    fn backend_config(config: &CaptureConfig) -> AudioBackendConfig {
        AudioBackendConfig {
            target_sample_rate: config.sample_rate,
            target_channels: config.channels,
            ..AudioBackendConfig::default()
        }
    }
}

#[async_trait::async_trait]
impl CaptureService for WavRecorder {
    async fn start(&mut self, config: &CaptureConfig) -> Result<()> {
        if self.active.is_some() {
            bail!("Recording already in progress");
        }

        fs::create_dir_all(&self.output_dir)
            .context("Failed to create recordings directory")?;

        let path = self
            .output_dir
            .join(format!("{}.wav", uuid::Uuid::new_v4()));

        if !config.quality_hints.is_empty() {
            info!("Capture quality hints: {:?}", config.quality_hints);
        }

        let mut backend = AudioBackendFactory::create(&self.source, Self::backend_config(config))
            .context("Failed to create audio backend")?;

        let writer = WavFileWriter::create(&path, config.sample_rate, config.channels)?;

        let audio_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                drop(writer);
                remove_recording(&path);
                return Err(e.context("Failed to start audio capture"));
            }
        };

        info!(
            "Recording started via {} -> {}",
            backend.name(),
            path.display()
        );

        let writer = tokio::spawn(writer.record(audio_rx));

        self.active = Some(ActiveRecording {
            backend,
            path,
            writer,
        });

        Ok(())
    }

    async fn stop(&mut self) -> Result<PathBuf> {
        let Some(mut recording) = self.active.take() else {
            bail!("No recording in progress");
        };

        let stopped = recording.backend.stop().await;

        let written = match recording.writer.await {
            Ok(Ok(samples)) => samples,
            Ok(Err(e)) => {
                remove_recording(&recording.path);
                return Err(e);
            }
            Err(e) => {
                remove_recording(&recording.path);
                bail!("Recording writer task failed: {}", e);
            }
        };

        if let Err(e) = stopped {
            remove_recording(&recording.path);
            return Err(e.context("Failed to stop audio capture"));
        }

        info!(
            "Recording stopped: {} ({} samples)",
            recording.path.display(),
            written
        );

        Ok(recording.path)
    }

    async fn cancel(&mut self) {
        let Some(mut recording) = self.active.take() else {
            return;
        };

        info!("Discarding recording {}", recording.path.display());

        recording.writer.abort();
        if let Err(e) = recording.backend.stop().await {
            warn!("Failed to stop audio capture: {}", e);
        }
        let _ = recording.writer.await;
        remove_recording(&recording.path);
    }
}

impl Drop for WavRecorder {
    fn drop(&mut self) {
        if let Some(recording) = self.active.take() {
            recording.writer.abort();
            remove_recording(&recording.path);
        }
    }
}

/// Load a finished recording into memory and delete it, whether or not the read succeeds
pub async fn read_recording(path: &Path) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read recording {}", path.display()));
    remove_recording(path);
    bytes
}

fn remove_recording(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to delete recording {}: {}", path.display(), e),
    }
}

/// Writes frames to a single WAV file
struct WavFileWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    spec: hound::WavSpec,
    sample_count: usize,
}

impl WavFileWriter {
    fn create(file_path: &Path, sample_rate: u32, channels: u16) -> Result<Self> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(file_path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", file_path))?;

        Ok(Self {
            writer: Some(writer),
            spec,
            sample_count: 0,
        })
    }

    async fn record(mut self, mut audio_rx: mpsc::Receiver<AudioFrame>) -> Result<usize> {
        while let Some(frame) = audio_rx.recv().await {
            self.write_frame(&frame)?;
        }
        self.finish()
    }

    fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        // The header is already written; a mismatched frame would mislabel the audio
        if frame.sample_rate != self.spec.sample_rate || frame.channels != self.spec.channels {
            bail!(
                "Frame format {}Hz/{}ch does not match recording {}Hz/{}ch",
                frame.sample_rate,
                frame.channels,
                self.spec.sample_rate,
                self.spec.channels
            );
        }

        if let Some(writer) = &mut self.writer {
            for &sample in &frame.samples {
                writer.write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.sample_count += frame.samples.len();
        }

        Ok(())
    }

    fn finish(mut self) -> Result<usize> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()
                .context("Failed to finalize WAV file")?;
        }

        Ok(self.sample_count)
    }
}

impl Drop for WavFileWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_rejects_mismatched_frames() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("take.wav");
        let mut writer = WavFileWriter::create(&path, 16000, 1)?;

        let matching = AudioFrame {
            samples: vec![1; 160],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 0,
        };
        writer.write_frame(&matching)?;

        let wrong_rate = AudioFrame {
            sample_rate: 8000,
            ..matching.clone()
        };
        assert!(writer.write_frame(&wrong_rate).is_err());

        let wrong_channels = AudioFrame {
            channels: 2,
            ..matching
        };
        assert!(writer.write_frame(&wrong_channels).is_err());

        assert_eq!(writer.finish()?, 160);
        assert_eq!(hound::WavReader::open(&path)?.len(), 160);

        Ok(())
    }
}
