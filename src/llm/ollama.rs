use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ContentBlock, LlmClient, LlmResponse, Message, Role, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const CONNECTION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OllamaClient {
    base_url: String,
    model: String,
    max_tokens: usize,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<usize>,
    #[serde(default)]
    eval_count: Option<usize>,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, model: String, max_tokens: usize, timeout: Duration) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Flatten the conversation into the single prompt `/api/generate` takes
    fn build_prompt(messages: &[Message]) -> String {
        messages
            .iter()
            .flat_map(|msg| {
                msg.content.iter().map(move |block| match block {
                    ContentBlock::Text { text } => match msg.role {
                        Role::User => text.clone(),
                        Role::Assistant => format!("Assistant: {}", text),
                    },
                })
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn send_message_with_system(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<LlmResponse> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: Self::build_prompt(messages),
            system: system_prompt.map(str::to_string),
            stream: false,
            options: GenerateOptions {
                num_predict: self.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama. Make sure Ollama is running (ollama serve)")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            anyhow::bail!("Ollama API error ({}): {}", status, error_text);
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .context("Failed to decode Ollama response")?;

        let usage = match (generated.prompt_eval_count, generated.eval_count) {
            (Some(input), Some(output)) => Some(TokenUsage::new(input, output)),
            _ => None,
        };

        Ok(LlmResponse {
            message: Message::assistant(vec![ContentBlock::Text {
                text: generated.response,
            }]),
            usage,
        })
    }

    async fn test_connection(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(CONNECTION_CHECK_TIMEOUT)
            .send()
            .await
            .context("Ollama is not running. Start it with: ollama serve")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama returned status {}", response.status());
        }

        tracing::info!("Ollama connection successful");
        Ok(())
    }
}
