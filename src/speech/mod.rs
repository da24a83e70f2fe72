pub mod client;
pub mod messages;

pub use client::SpeechClient;
pub use messages::{RecognizeRequest, RecognizeResponse};
