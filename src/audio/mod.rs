pub mod backend;
pub mod command;
pub mod file;
pub mod recorder;
pub mod resampler;

pub use backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource,
};
pub use command::CommandBackend;
pub use file::{AudioFile, FileBackend};
pub use recorder::{read_recording, WavRecorder};
pub use resampler::{resample_pcm, PcmResampler};
