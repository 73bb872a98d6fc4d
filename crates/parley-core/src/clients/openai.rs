//! OpenAI-compatible chat completion client

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::types::ChatClient;

/// Chat client for the OpenAI `/v1/chat/completions` wire format
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiChatClient {
    pub fn new(api_key: String, model: String, base_url: String, max_tokens: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url,
            model,
            max_tokens,
        }
    }

    /// Pull the reply text out of a completion response
    fn response_text(resp: ChatCompletionResponse) -> Result<String> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Completion response had no choices"))?;
        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": temperature,
            "messages": [
                WireMessage { role: "system", content: system_prompt },
                WireMessage { role: "user", content: user_prompt },
            ],
        });

        debug!(
            "Chat request: model={}, system={} chars, user={} chars",
            self.model,
            system_prompt.len(),
            user_prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send chat completion request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Chat completion request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        Self::response_text(api_response)
    }
}

// ── Wire types ──

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
