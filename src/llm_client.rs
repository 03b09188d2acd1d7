//! Client for the external generative-language API.
//!
//! The orchestrator only ever sees the `ReplyGenerator` trait: an ordered
//! list of role-tagged turns plus generation parameters, and either usable
//! text or an error. Everything that can go wrong here (non-2xx, malformed
//! JSON, empty candidates) is a plain error routed to the fallback engine.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LunaConfig;

#[derive(Debug, Clone)]
pub struct Turn {
    pub role: String,
    pub text: String,
}

impl Turn {
    pub fn new(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// The seam the orchestrator depends on, so tests can swap in canned or
/// always-failing generators without network mocking.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, turns: &[Turn], params: GenerationParams) -> Result<String>;
}

#[derive(Clone)]
pub struct GenerativeClient {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GenerativeClient {
    pub fn new(config: &LunaConfig) -> Self {
        Self {
            api_url: config.gemini_api_url.clone(),
            api_key: config.gemini_api_key.clone().unwrap_or_default(),
            model: config.gemini_model.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl ReplyGenerator for GenerativeClient {
    async fn generate(&self, turns: &[Turn], params: GenerationParams) -> Result<String> {
        let request = GenerateContentRequest {
            contents: turns
                .iter()
                .map(|turn| Content {
                    role: Some(turn.role.clone()),
                    parts: vec![Part {
                        text: turn.text.clone(),
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.request_url())
            .json(&request)
            .send()
            .await
            .context("Failed to send generate request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            anyhow::bail!("Generative API returned error {}: {}", status, body);
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse generate response")?;

        let text = completion
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow::anyhow!("No candidate text in response"))?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_carries_model_and_key() {
        let config = LunaConfig {
            gemini_api_url: "https://example.test/v1beta".to_string(),
            gemini_model: "gemini-1.5-pro".to_string(),
            gemini_api_key: Some("k123".to_string()),
            ..LunaConfig::default()
        };
        let client = GenerativeClient::new(&config);
        assert_eq!(
            client.request_url(),
            "https://example.test/v1beta/models/gemini-1.5-pro:generateContent?key=k123"
        );
    }

    #[test]
    fn empty_candidates_parse_but_yield_no_text() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").expect("parse");
        assert!(parsed.candidates.is_empty());
    }
}
