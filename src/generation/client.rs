use anyhow::{bail, Context, Result};
use tracing::{debug, error, info};

use super::messages::{GenerateRequest, GenerateResponse};
use crate::config::GenerationConfig;
use crate::ports::Generator;

/// Text generation over the `generateContent` REST API
pub struct GenerationClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl GenerationClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .context("Generation API key required")?;

        let url = format!(
            "{}/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl Generator for GenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Requesting generation for prompt: {}", prompt);

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", &self.api_key)])
            .json(&GenerateRequest::prompt(prompt))
            .send()
            .await
            .map_err(|e| {
                error!("Generation request failed: {}", e);
                e
            })
            .context("Generation request failed")?;

        let status = response.status();
        debug!("Generation API responded with {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Generation API error {}: {}", status, body);
            bail!("Generation API error {}: {}", status, body);
        }

        let result: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse generation response")?;

        let answer = result
            .answer()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .context("Generation response has no candidate text")?
            .to_string();

        info!("Generation complete ({} chars)", answer.len());
        Ok(answer)
    }
}
