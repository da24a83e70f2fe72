// Shared fakes for orchestrator tests
//
// Every fake counts its calls. Gated fakes hold their reply until the test
// adds a permit, so intermediate states can be observed.

#![allow(dead_code)]

pub mod mock_api;

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use voice_ask::{
    CaptureConfig, CaptureService, Generator, Orchestrator, OrchestratorHandle, PermissionGate,
    PermissionStatus, Services, SessionConfig, Snapshot, SpeechParams, Synthesizer, Transcriber,
};

/// Contents of every fake recording
pub const RECORDING: &[u8] = b"RIFF-fake-recording";

/// How a fake answers
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    /// Never answers
    Hang,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }

    pub fn fail(s: &str) -> Self {
        Reply::Fail(s.to_string())
    }

    async fn resolve(&self, gate: &Option<Arc<Semaphore>>) -> Result<String> {
        if let Some(gate) = gate {
            gate.acquire().await?.forget();
        }
        match self {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(message) => bail!("{}", message),
            Reply::Hang => std::future::pending().await,
        }
    }
}

// ----------------------------------------------------------------------------
// Permission
// ----------------------------------------------------------------------------

pub struct FakePermission {
    status: PermissionStatus,
    gate: Option<Arc<Semaphore>>,
    pub requests: AtomicUsize,
}

impl FakePermission {
    pub fn granted() -> Self {
        Self {
            status: PermissionStatus::Granted,
            gate: None,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            status: PermissionStatus::Denied,
            ..Self::granted()
        }
    }

    /// Grants once the test releases the gate
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::granted()
        }
    }
}

#[async_trait::async_trait]
impl PermissionGate for FakePermission {
    async fn request(&self) -> PermissionStatus {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return PermissionStatus::Denied,
            }
        }
        self.status
    }
}

// ----------------------------------------------------------------------------
// Capture
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct CaptureStats {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub cancels: AtomicUsize,
}

/// Writes a small file on `stop`, the way a real recorder hands over a WAV
pub struct FakeCapture {
    dir: PathBuf,
    stats: Arc<CaptureStats>,
    fail_start: bool,
    recording: bool,
}

impl FakeCapture {
    pub fn new(dir: &Path, stats: Arc<CaptureStats>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            stats,
            fail_start: false,
            recording: false,
        }
    }

    pub fn failing(dir: &Path, stats: Arc<CaptureStats>) -> Self {
        Self {
            fail_start: true,
            ..Self::new(dir, stats)
        }
    }
}

#[async_trait::async_trait]
impl CaptureService for FakeCapture {
    async fn start(&mut self, config: &CaptureConfig) -> Result<()> {
        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            bail!("microphone unavailable");
        }
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.channels, 1);
        self.recording = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<PathBuf> {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        if !self.recording {
            bail!("not recording");
        }
        self.recording = false;
        let n = self.stats.stops.load(Ordering::SeqCst);
        let path = self.dir.join(format!("recording-{}.wav", n));
        std::fs::write(&path, RECORDING)?;
        Ok(path)
    }

    async fn cancel(&mut self) {
        self.stats.cancels.fetch_add(1, Ordering::SeqCst);
        self.recording = false;
    }
}

// ----------------------------------------------------------------------------
// Transcription / generation / synthesis
// ----------------------------------------------------------------------------

pub struct FakeTranscriber {
    reply: Reply,
    gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
    pub received: Mutex<Vec<Vec<u8>>>,
}

impl FakeTranscriber {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            gate: None,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(reply: Reply, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(reply)
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(audio.to_vec());
        self.reply.resolve(&self.gate).await
    }
}

pub struct FakeGenerator {
    reply: Reply,
    gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            gate: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(reply: Reply, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(reply)
        }
    }
}

#[async_trait::async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.resolve(&self.gate).await
    }
}

pub struct FakeSynthesizer {
    fail: Option<String>,
    gate: Option<Arc<Semaphore>>,
    pub spoken: Mutex<Vec<String>>,
    pub stops: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            fail: None,
            gate: None,
            spoken: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Each utterance finishes only when the test adds a permit
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn speak(&self, text: &str, _params: &SpeechParams) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        match &self.fail {
            Some(message) => bail!("{}", message),
            None => Ok(()),
        }
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ----------------------------------------------------------------------------
// Harness
// ----------------------------------------------------------------------------

/// Fakes wired into a running orchestrator, kept for later inspection
pub struct Harness {
    pub handle: OrchestratorHandle,
    pub permission: Arc<FakePermission>,
    pub capture: Arc<CaptureStats>,
    pub transcriber: Arc<FakeTranscriber>,
    pub generator: Arc<FakeGenerator>,
    pub synthesizer: Arc<FakeSynthesizer>,
}

pub struct HarnessBuilder {
    config: SessionConfig,
    dir: PathBuf,
    permission: FakePermission,
    failing_capture: bool,
    transcriber: FakeTranscriber,
    generator: FakeGenerator,
    synthesizer: FakeSynthesizer,
}

impl HarnessBuilder {
    pub fn new(dir: &Path) -> Self {
        Self {
            config: SessionConfig::default(),
            dir: dir.to_path_buf(),
            permission: FakePermission::granted(),
            failing_capture: false,
            transcriber: FakeTranscriber::new(Reply::text("What is the capital of France?")),
            generator: FakeGenerator::new(Reply::text("The capital of France is Paris.")),
            synthesizer: FakeSynthesizer::new(),
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn permission(mut self, permission: FakePermission) -> Self {
        self.permission = permission;
        self
    }

    pub fn failing_capture(mut self) -> Self {
        self.failing_capture = true;
        self
    }

    pub fn transcriber(mut self, transcriber: FakeTranscriber) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn generator(mut self, generator: FakeGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn synthesizer(mut self, synthesizer: FakeSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn spawn(self) -> Harness {
        let permission = Arc::new(self.permission);
        let capture = Arc::new(CaptureStats::default());
        let transcriber = Arc::new(self.transcriber);
        let generator = Arc::new(self.generator);
        let synthesizer = Arc::new(self.synthesizer);

        let capture_service: Box<dyn CaptureService> = if self.failing_capture {
            Box::new(FakeCapture::failing(&self.dir, capture.clone()))
        } else {
            Box::new(FakeCapture::new(&self.dir, capture.clone()))
        };

        let services = Services {
            permission: permission.clone(),
            capture: capture_service,
            transcriber: transcriber.clone(),
            generator: generator.clone(),
            synthesizer: synthesizer.clone(),
        };

        Harness {
            handle: Orchestrator::spawn(self.config, services),
            permission,
            capture,
            transcriber,
            generator,
            synthesizer,
        }
    }
}

/// Wait (bounded) until the published snapshot satisfies `predicate`
pub async fn settle(
    handle: &OrchestratorHandle,
    predicate: impl FnMut(&Snapshot) -> bool,
) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(5), handle.wait_for(predicate))
        .await
        .expect("orchestrator did not reach the expected state")
}

/// Files still present in `dir`
pub fn leftover_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}
