use anyhow::{bail, Context, Result};
use base64::Engine;
use tracing::{debug, error, info};

use super::messages::{RecognitionAudio, RecognitionConfig, RecognizeRequest, RecognizeResponse};
use crate::config::SpeechConfig;
use crate::ports::{Transcriber, NO_SPEECH_DETECTED};

/// Speech-to-text over the cloud `speech:recognize` REST API
pub struct SpeechClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    language_code: String,
    model: String,
    sample_rate: u32,
}

impl SpeechClient {
    pub fn new(config: &SpeechConfig, sample_rate: u32) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .context("Speech API key required")?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: config.endpoint.clone(),
            language_code: config.language_code.clone(),
            model: config.model.clone(),
            sample_rate,
        })
    }

    pub fn request_body(&self, audio: &[u8]) -> RecognizeRequest {
        RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16".to_string(),
                sample_rate_hertz: self.sample_rate,
                language_code: self.language_code.clone(),
                model: self.model.clone(),
            },
            audio: RecognitionAudio {
                content: base64::engine::general_purpose::STANDARD.encode(audio),
            },
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for SpeechClient {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        debug!("Starting transcription ({} bytes)", audio.len());

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&self.request_body(audio))
            .send()
            .await
            .map_err(|e| {
                error!("Speech request failed: {}", e);
                e
            })
            .context("Speech request failed")?;

        let status = response.status();
        debug!("Speech API responded with {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Speech API error {}: {}", status, body);
            bail!("Speech API error {}: {}", status, body);
        }

        let result: RecognizeResponse = response
            .json()
            .await
            .context("Failed to parse speech response")?;

        match result.transcript() {
            Some(text) => {
                info!("Transcription complete: {}", text);
                Ok(text)
            }
            None => {
                info!("No speech detected");
                Ok(NO_SPEECH_DETECTED.to_string())
            }
        }
    }
}
