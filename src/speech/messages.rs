use serde::{Deserialize, Serialize};

/// Body of a `speech:recognize` request
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognizeRequest {
    pub config: RecognitionConfig,
    pub audio: RecognitionAudio,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    pub encoding: String,  // "LINEAR16"
    pub sample_rate_hertz: u32,
    pub language_code: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecognitionAudio {
    pub content: String,  // Base64-encoded WAV bytes
}

/// Recognizer response; `results` is omitted entirely when no speech was heard
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecognizeResponse {
    #[serde(default)]
    pub results: Option<Vec<RecognitionResult>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecognitionAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl RecognizeResponse {
    /// Best alternative of every result, joined; `None` when nothing was recognised
    pub fn transcript(&self) -> Option<String> {
        let results = self.results.as_ref()?;

        let text = results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16".to_string(),
                sample_rate_hertz: 16000,
                language_code: "en-US".to_string(),
                model: "latest_short".to_string(),
            },
            audio: RecognitionAudio {
                content: "AAAA".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["config"]["sampleRateHertz"], 16000);
        assert_eq!(json["config"]["languageCode"], "en-US");
        assert_eq!(json["audio"]["content"], "AAAA");
    }

    #[test]
    fn test_empty_alternatives_are_skipped() {
        let response: RecognizeResponse = serde_json::from_str(
            r#"{"results":[{"alternatives":[]},{"alternatives":[{"transcript":"hi"}]}]}"#,
        )
        .unwrap();

        assert_eq!(response.transcript().as_deref(), Some("hi"));
    }

    #[test]
    fn test_blank_transcripts_mean_nothing_recognised() {
        let response: RecognizeResponse =
            serde_json::from_str(r#"{"results":[{"alternatives":[{"transcript":"  "}]}]}"#)
                .unwrap();

        assert!(response.transcript().is_none());
    }
}
