use std::env;

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};

use crate::web::models::Turn;

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Seam between the HTTP layer and the remote generative-language service.
/// Handlers only see this trait, so tests can swap in a stub.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends the whole transcript and returns the model's reply text.
    async fn send(&self, history: &[Turn]) -> Result<String>;
}

/// Client for the hosted generateContent API.
pub struct GeminiClient {
    api_url: String,
    model_name: String,
    api_key: String,
    client: Client,
}

impl GeminiClient {
    pub fn new() -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY is not set")?;
        let api_url = env::var("GEMINI_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let model_name = env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        info!("Using generative model {} at {}", model_name, api_url);

        Ok(Self {
            api_url,
            model_name,
            api_key,
            client: Client::new(),
        })
    }
}

#[async_trait::async_trait]
impl ChatBackend for GeminiClient {
    async fn send(&self, history: &[Turn]) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model_name
        );

        let payload = json!({ "contents": history });
        debug!("Payload: {}", payload);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("API request failed ({}): {}", status, error_text));
        }

        let response_json: Value = response.json().await?;
        debug!("Response JSON: {}", response_json);

        let text = response_json
            .get("candidates")
            .and_then(|candidates| candidates.get(0))
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.get(0))
            .and_then(|part| part.get("text"))
            .and_then(|text| text.as_str())
            .ok_or_else(|| anyhow::anyhow!("No text candidate in API response"))?;

        Ok(text.to_string())
    }
}
