pub mod client;
pub mod messages;

pub use client::GenerationClient;
pub use messages::{GenerateRequest, GenerateResponse};
