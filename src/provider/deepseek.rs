//! DeepSeek chat backend.
//!
//! DeepSeek speaks an OpenAI-shaped schema but its reasoning models return a
//! separate `reasoning_content` field, which is dropped here.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BackendError;
use crate::types::{Message, Role};

use super::http::{endpoint, post_json};
use super::ChatBackend;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

pub struct DeepSeekBackend {
    client: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl DeepSeekBackend {
    pub fn new(
        client: reqwest::Client,
        model: String,
        api_key: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
        }
    }
}

#[async_trait]
impl ChatBackend for DeepSeekBackend {
    fn backend_name(&self) -> &str {
        "deepseek"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, conversation: &[Message]) -> Result<Message, BackendError> {
        let url = endpoint(&self.base_url, "chat/completions");
        debug!(model = %self.model, messages = conversation.len(), "DeepSeek complete");

        let body = DeepSeekRequest {
            model: &self.model,
            messages: conversation
                .iter()
                .map(|m| DeepSeekMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            stream: false,
        };
        let data: DeepSeekResponse =
            post_json(&self.client, &url, &self.api_key, &body, self.timeout).await?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("no choices in DeepSeek response".into()))?;

        if let Some(reasoning) = choice.message.reasoning_content.as_deref() {
            debug!(chars = reasoning.len(), "discarding DeepSeek reasoning content");
        }

        Ok(Message::assistant(choice.message.content.unwrap_or_default()))
    }
}

// DeepSeek API wire types (internal)

#[derive(Serialize)]
struct DeepSeekRequest<'a> {
    model: &'a str,
    messages: Vec<DeepSeekMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct DeepSeekMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Deserialize)]
struct DeepSeekResponse {
    choices: Vec<DeepSeekChoice>,
}

#[derive(Deserialize)]
struct DeepSeekChoice {
    message: DeepSeekReply,
}

#[derive(Deserialize)]
struct DeepSeekReply {
    content: Option<String>,
    reasoning_content: Option<String>,
}
