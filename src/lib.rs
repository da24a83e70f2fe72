pub mod audio;
pub mod config;
pub mod error;
pub mod generation;
pub mod http;
pub mod orchestrator;
pub mod permission;
pub mod ports;
pub mod session;
pub mod speech;
pub mod synthesis;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    WavRecorder,
};
pub use config::Config;
pub use error::{ConfigError, ErrorKind, InteractionError};
pub use generation::GenerationClient;
pub use http::{create_router, AppState};
pub use orchestrator::{
    ActionOutcome, InteractionEvent, Orchestrator, OrchestratorHandle, RejectReason, Services,
};
pub use ports::{
    CaptureConfig, CaptureService, Generator, PermissionGate, PermissionStatus, SpeechParams,
    Synthesizer, Transcriber, NO_SPEECH_DETECTED,
};
pub use session::{Controls, InteractionState, Session, SessionConfig, SessionId, Snapshot};
pub use speech::SpeechClient;
pub use synthesis::CommandSynthesizer;
