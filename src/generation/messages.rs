use serde::{Deserialize, Serialize};

/// Body of a `generateContent` request
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateRequest {
    /// Single-turn request carrying only the prompt
    pub fn prompt(text: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(text.to_string()),
                }],
            }],
        }
    }
}

impl GenerateResponse {
    /// `candidates[0].content.parts[0].text`, if the whole path is present
    pub fn answer(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}
