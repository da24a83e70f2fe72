//! Interfaces the orchestrator needs from its external collaborators
//!
//! Each port is a thin async trait. Concrete adapters live in `audio`,
//! `speech`, `generation`, `synthesis` and `permission`; tests substitute
//! in-memory fakes.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Transcript reported when the recognizer finds nothing to transcribe
pub const NO_SPEECH_DETECTED: &str = "No speech detected";

/// Outcome of a microphone permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    /// 16-bit signed little-endian PCM
    LinearPcm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioContainer {
    Wav,
}

/// Recording parameters handed to the capture service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: AudioEncoding,
    pub container: AudioContainer,
    /// Free-form platform hints (e.g. "high_quality"), passed through untouched
    pub quality_hints: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Speech recognizer expects 16kHz
            channels: 1,        // Mono
            encoding: AudioEncoding::LinearPcm,
            container: AudioContainer::Wav,
            quality_hints: Vec::new(),
        }
    }
}

/// Voice parameters for speech output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechParams {
    /// Language / voice identifier understood by the synthesizer
    pub language: String,
    /// Speaking rate multiplier (1.0 = normal)
    pub rate: f32,
    /// Pitch multiplier (1.0 = normal)
    pub pitch: f32,
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            language: "en-us".to_string(),
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

#[async_trait::async_trait]
pub trait PermissionGate: Send + Sync {
    /// Ask for microphone access
    async fn request(&self) -> PermissionStatus;
}

/// Microphone capture service
///
/// The path returned by `stop` is an ephemeral recording owned by the caller,
/// which must delete it once read.
#[async_trait::async_trait]
pub trait CaptureService: Send {
    /// Start recording with the given parameters
    async fn start(&mut self, config: &CaptureConfig) -> Result<()>;

    /// Stop recording and return the location of the finished WAV file
    async fn stop(&mut self) -> Result<PathBuf>;

    /// Stop recording and discard whatever was captured
    async fn cancel(&mut self);
}

#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a WAV buffer; returns [`NO_SPEECH_DETECTED`] when nothing was recognised
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Speech output
///
/// The future returned by `speak` resolves when the utterance is finished.
/// Dropping it cancels the utterance.
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    async fn speak(&self, text: &str, params: &SpeechParams) -> Result<()>;

    /// Silence any utterance currently playing
    async fn stop(&self) {}
}
