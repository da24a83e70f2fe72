// Microphone backend driven by an external recorder process
//
// The recorder (arecord by default) writes raw 16-bit little-endian PCM to
// stdout; we cut that stream into fixed-size frames. Stopping kills the
// process, which closes stdout and ends the reader task.

use anyhow::{bail, Context, Result};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    config: AudioBackendConfig,
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
}

impl CommandBackend {
    pub fn new(command: Vec<String>, config: AudioBackendConfig) -> Result<Self> {
        let mut parts = command.into_iter();
        let program = match parts.next() {
            Some(p) if !p.is_empty() => p,
            _ => bail!("Recorder command is empty"),
        };

        info!(
            "Recorder backend initialized: {} ({}Hz, {} channels)",
            program, config.target_sample_rate, config.target_channels
        );

        Ok(Self {
            program,
            args: parts.collect(),
            config,
            child: None,
            reader: None,
        })
    }

    fn frame_from_bytes(
        bytes: &[u8],
        config: &AudioBackendConfig,
        timestamp_ms: u64,
    ) -> AudioFrame {
        let samples = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();

        AudioFrame {
            samples,
            sample_rate: config.target_sample_rate,
            channels: config.target_channels,
            timestamp_ms,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for CommandBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.child.is_some() {
            bail!("Already capturing");
        }

        info!("Starting recorder: {} {:?}", self.program, self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("-r")
            .arg(self.config.target_sample_rate.to_string())
            .arg("-c")
            .arg(self.config.target_channels.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn recorder `{}`", self.program))?;

        let mut stdout = child
            .stdout
            .take()
            .context("Recorder stdout was not captured")?;

        let (tx, rx) = mpsc::channel(100);
        let config = self.config.clone();
        let frame_bytes = config.samples_per_buffer() * 2;

        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; frame_bytes];
            let mut filled = 0;
            let mut timestamp_ms = 0u64;

            loop {
                match stdout.read(&mut buf[filled..]).await {
                    Ok(0) => break,
                    Ok(n) => {
                        filled += n;
                        if filled < frame_bytes {
                            continue;
                        }
                        let frame = Self::frame_from_bytes(&buf, &config, timestamp_ms);
                        timestamp_ms += frame.duration_ms();
                        filled = 0;
                        if tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Recorder read failed: {}", e);
                        break;
                    }
                }
            }

            // Flush the partial tail
            if filled >= 2 {
                let frame = Self::frame_from_bytes(&buf[..filled], &config, timestamp_ms);
                let _ = tx.send(frame).await;
            }

            debug!("Recorder reader stopped");
        });

        self.child = Some(child);
        self.reader = Some(reader);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        info!("Stopping recorder: {}", self.program);

        if let Err(e) = child.kill().await {
            warn!("Failed to kill recorder: {}", e);
        }

        if let Some(reader) = self.reader.take() {
            reader.await.context("Recorder reader task panicked")?;
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.child.is_some()
    }

    fn name(&self) -> &str {
        &self.program
    }
}
