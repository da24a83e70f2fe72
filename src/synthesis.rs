//! Speech output through a local text-to-speech program

use anyhow::{bail, Context, Result};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::SynthesisConfig;
use crate::ports::{SpeechParams, Synthesizer};

/// eSpeak default speaking rate in words per minute
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
/// eSpeak default pitch (0-99)
const BASE_PITCH: f32 = 50.0;

/// Speaks text by piping it into an eSpeak-compatible command
///
/// The child process is killed when the `speak` future is dropped or when
/// `stop` is called.
pub struct CommandSynthesizer {
    program: String,
    interrupt: Arc<Notify>,
}

impl CommandSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            program: config.command.clone(),
            interrupt: Arc::new(Notify::new()),
        }
    }

    /// Arguments for one utterance; the text itself goes to stdin
    pub fn args(params: &SpeechParams) -> Vec<String> {
        let words_per_minute = (BASE_WORDS_PER_MINUTE * params.rate).round().clamp(80.0, 500.0);
        let pitch = (BASE_PITCH * params.pitch).round().clamp(0.0, 99.0);

        vec![
            "-v".to_string(),
            params.language.clone(),
            "-s".to_string(),
            format!("{}", words_per_minute as u32),
            "-p".to_string(),
            format!("{}", pitch as u32),
            "--stdin".to_string(),
        ]
    }
}

#[async_trait::async_trait]
impl Synthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str, params: &SpeechParams) -> Result<()> {
        info!("Speaking {} chars with {}", text.len(), self.program);

        let interrupted = self.interrupt.notified();
        tokio::pin!(interrupted);

        let mut child = Command::new(&self.program)
            .args(Self::args(params))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn `{}`", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .context("Failed to send text to synthesizer")?;
            // Closing stdin tells the synthesizer the utterance is complete
            drop(stdin);
        }

        tokio::select! {
            status = child.wait() => {
                let status = status.context("Failed to wait for synthesizer")?;
                if !status.success() {
                    bail!("Synthesizer exited with {}", status);
                }
                debug!("Utterance finished");
                Ok(())
            }
            _ = &mut interrupted => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill synthesizer: {}", e);
                }
                bail!("Speech interrupted")
            }
        }
    }

    async fn stop(&self) {
        self.interrupt.notify_waiters();
    }
}
