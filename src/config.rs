use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::ports::{AudioContainer, AudioEncoding, CaptureConfig, SpeechParams};
use crate::session::SessionConfig;

/// Environment variable prefix, e.g. `VOICE_ASK__SPEECH__API_KEY`
pub const ENV_PREFIX: &str = "VOICE_ASK";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub permission: PermissionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Directory for ephemeral recordings (deleted after transcription)
    #[serde(default = "default_recordings_path")]
    pub recordings_path: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Recorder process emitting raw S16LE PCM on stdout
    #[serde(default = "default_capture_command")]
    pub capture_command: Vec<String>,
    #[serde(default)]
    pub quality_hints: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default = "default_speech_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Image-analysis key; loaded for completeness, not used by the voice pipeline
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisionConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_synthesis_command")]
    pub command: String,
    #[serde(default = "default_voice")]
    pub language: String,
    #[serde(default = "default_unit")]
    pub rate: f32,
    #[serde(default = "default_unit")]
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    #[default]
    Granted,
    Denied,
    Prompt,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionConfig {
    #[serde(default)]
    pub microphone: PermissionMode,
}

impl Config {
    /// Load from an optional file plus `VOICE_ASK__*` environment variables
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Parse an inline TOML document (no environment overlay)
    pub fn from_toml(toml: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load and validate in one step; the process must not start otherwise
    pub fn load_validated(path: &str) -> Result<Self> {
        let cfg = Self::load(path).with_context(|| format!("Failed to load config from {}", path))?;
        cfg.validate().context("Invalid configuration")?;
        Ok(cfg)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_key(&self.speech.api_key, "speech.api_key")?;
        require_key(&self.generation.api_key, "generation.api_key")?;

        if self.audio.sample_rate == 0 {
            return Err(ConfigError::Invalid {
                key: "audio.sample_rate",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(1..=2).contains(&self.audio.channels) {
            return Err(ConfigError::Invalid {
                key: "audio.channels",
                reason: format!("expected 1 or 2, got {}", self.audio.channels),
            });
        }
        if self.audio.capture_command.is_empty() {
            return Err(ConfigError::Invalid {
                key: "audio.capture_command",
                reason: "must name a recorder program".to_string(),
            });
        }
        if self.speech.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "speech.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "generation.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Orchestrator settings derived from this configuration
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            capture: CaptureConfig {
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
                encoding: AudioEncoding::LinearPcm,
                container: AudioContainer::Wav,
                quality_hints: self.audio.quality_hints.clone(),
            },
            speech: SpeechParams {
                language: self.synthesis.language.clone(),
                rate: self.synthesis.rate,
                pitch: self.synthesis.pitch,
            },
            transcription_timeout: Duration::from_secs(self.speech.timeout_secs),
            generation_timeout: Duration::from_secs(self.generation.timeout_secs),
            ..SessionConfig::default()
        }
    }

    pub fn recordings_dir(&self) -> PathBuf {
        PathBuf::from(&self.audio.recordings_path)
    }
}

fn require_key(value: &Option<String>, key: &'static str) -> std::result::Result<(), ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::MissingKey(key)),
    }
}

/// Show only enough of a secret to tell keys apart
pub fn redact(value: &Option<String>) -> String {
    match value {
        Some(v) if v.chars().count() > 4 => format!("{}…", v.chars().take(4).collect::<String>()),
        Some(v) if !v.is_empty() => "…".to_string(),
        _ => "<unset>".to_string(),
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            recordings_path: default_recordings_path(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            capture_command: default_capture_command(),
            quality_hints: Vec::new(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_speech_endpoint(),
            language_code: default_language_code(),
            model: default_speech_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            command: default_synthesis_command(),
            language: default_voice(),
            rate: default_unit(),
            pitch: default_unit(),
        }
    }
}

fn default_service_name() -> String {
    "voice-ask".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8088
}

fn default_recordings_path() -> String {
    std::env::temp_dir().join("voice-ask").display().to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_capture_command() -> Vec<String> {
    ["arecord", "-q", "-t", "raw", "-f", "S16_LE"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_speech_endpoint() -> String {
    "https://speech.googleapis.com/v1/speech:recognize".to_string()
}

fn default_language_code() -> String {
    "en-US".to_string()
}

fn default_speech_model() -> String {
    "latest_short".to_string()
}

fn default_generation_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_generation_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_synthesis_command() -> String {
    "espeak-ng".to_string()
}

fn default_voice() -> String {
    "en-us".to_string()
}

fn default_unit() -> f32 {
    1.0
}
