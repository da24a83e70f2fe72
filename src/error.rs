//! Error types for voice-ask
//!
//! Stage failures inside an interaction are classified by the stage that
//! raised them and carried as [`InteractionError`]. Configuration problems
//! are reported at startup as [`ConfigError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which stage of an interaction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Microphone access was refused
    PermissionDenied,
    /// Recording could not be started or stopped
    CaptureFailed,
    /// Speech-to-text request failed (network, non-2xx, timeout)
    TranscriptionFailed,
    /// Text generation failed (network, non-2xx, malformed body, timeout)
    GenerationFailed,
    /// Speech output failed
    SynthesisFailed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::CaptureFailed => "capture failed",
            ErrorKind::TranscriptionFailed => "transcription failed",
            ErrorKind::GenerationFailed => "generation failed",
            ErrorKind::SynthesisFailed => "synthesis failed",
        };
        f.write_str(name)
    }
}

/// A classified stage failure, shown to the user as-is
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct InteractionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl InteractionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify an adapter failure, keeping the whole context chain
    pub fn from_source(kind: ErrorKind, err: &anyhow::Error) -> Self {
        Self::new(kind, format!("{:#}", err))
    }
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required secret is absent or empty
    #[error("missing required configuration key `{0}`")]
    MissingKey(&'static str),

    /// A value is present but unusable
    #[error("invalid configuration value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
