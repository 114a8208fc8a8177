use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;

pub mod ollama;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

/// Token usage information from LLM response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Response from LLM including message and token usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub message: Message,
    pub usage: Option<TokenUsage>,
}

impl LlmResponse {
    /// Concatenated text of every text block
    pub fn text(&self) -> String {
        self.message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a message to the LLM with optional system prompt
    /// Returns both the message and token usage
    async fn send_message_with_system(
        &self,
        messages: &[Message],
        system_prompt: Option<&str>,
    ) -> Result<LlmResponse>;

    /// Check that the backing service is reachable
    async fn test_connection(&self) -> Result<()>;
}

/// Create the LLM client used by the alternate planner
pub fn create_client(config: &PlannerConfig) -> Box<dyn LlmClient> {
    tracing::info!("🦙 Using Ollama model {} for goal planning", config.model);
    Box::new(ollama::OllamaClient::new(
        config.base_url.clone(),
        config.model.clone(),
        config.max_tokens,
        std::time::Duration::from_secs(config.timeout_secs),
    ))
}

impl Message {
    pub fn user(text: String) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text }],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }
}
