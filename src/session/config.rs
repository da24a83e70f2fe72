use crate::ports::{CaptureConfig, SpeechParams};
use std::time::Duration;

/// Settings the orchestrator applies to every session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Recording parameters (16kHz mono WAV by default)
    pub capture: CaptureConfig,

    /// Voice used when reading answers aloud
    pub speech: SpeechParams,

    /// Upper bound on a speech-to-text request
    pub transcription_timeout: Duration,

    /// Upper bound on a generation request
    pub generation_timeout: Duration,

    /// Capacity of the event broadcast channel
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            speech: SpeechParams::default(),
            transcription_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(30),
            event_buffer: 64,
        }
    }
}
