//! Microphone permission gates

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::PermissionMode;
use crate::ports::{PermissionGate, PermissionStatus};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// One buffered line reader shared by everything that reads the terminal
///
/// Clones read from the same buffer, so a line consumed by one reader is
/// never also seen (or lost) by another.
#[derive(Clone)]
pub struct LineSource {
    lines: Arc<Mutex<Lines<BufReader<BoxedReader>>>>,
}

impl LineSource {
    pub fn stdin() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        let reader: BoxedReader = Box::new(reader);
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(reader).lines())),
        }
    }

    /// Next line without its terminator; `None` at end of input
    pub async fn next_line(&self) -> Result<Option<String>> {
        self.lines
            .lock()
            .await
            .next_line()
            .await
            .context("Failed to read terminal input")
    }
}

/// Answers every request the same way
pub struct StaticPermission(pub PermissionStatus);

#[async_trait::async_trait]
impl PermissionGate for StaticPermission {
    async fn request(&self) -> PermissionStatus {
        self.0
    }
}

/// Asks on the terminal; a grant is remembered for the rest of the process
pub struct PromptPermission {
    input: LineSource,
    granted: AtomicBool,
}

impl PromptPermission {
    pub fn new(input: LineSource) -> Self {
        Self {
            input,
            granted: AtomicBool::new(false),
        }
    }

    pub fn parse_answer(line: &str) -> PermissionStatus {
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => PermissionStatus::Granted,
            _ => PermissionStatus::Denied,
        }
    }
}

#[async_trait::async_trait]
impl PermissionGate for PromptPermission {
    async fn request(&self) -> PermissionStatus {
        if self.granted.load(Ordering::SeqCst) {
            return PermissionStatus::Granted;
        }

        let mut stdout = tokio::io::stdout();
        if let Err(e) = stdout.write_all(b"Allow microphone access? [y/N] ").await {
            warn!("Failed to write permission prompt: {}", e);
        }
        let _ = stdout.flush().await;

        let status = match self.input.next_line().await {
            Ok(Some(line)) => Self::parse_answer(&line),
            Ok(None) => PermissionStatus::Denied,
            Err(e) => {
                warn!("Failed to read permission answer: {}", e);
                PermissionStatus::Denied
            }
        };

        if status == PermissionStatus::Granted {
            self.granted.store(true, Ordering::SeqCst);
        }
        info!("Microphone permission: {:?}", status);

        status
    }
}

/// Gate selected by configuration; `input` answers the prompt
pub fn from_mode(mode: PermissionMode, input: LineSource) -> Box<dyn PermissionGate> {
    match mode {
        PermissionMode::Granted => Box::new(StaticPermission(PermissionStatus::Granted)),
        PermissionMode::Denied => Box::new(StaticPermission(PermissionStatus::Denied)),
        PermissionMode::Prompt => Box::new(PromptPermission::new(input)),
    }
}
