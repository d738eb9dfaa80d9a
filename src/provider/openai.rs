//! OpenAI Chat Completions backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BackendError;
use crate::types::{Message, Role};

use super::http::{endpoint, post_json};
use super::ChatBackend;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiBackend {
    client: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiBackend {
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

    fn build_request<'a>(&'a self, conversation: &'a [Message]) -> OpenAiChatRequest<'a> {
        OpenAiChatRequest {
            model: &self.model,
            messages: conversation.iter().map(message_to_openai).collect(),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn backend_name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, conversation: &[Message]) -> Result<Message, BackendError> {
        let url = endpoint(&self.base_url, "chat/completions");
        debug!(model = %self.model, messages = conversation.len(), "OpenAI complete");

        let body = self.build_request(conversation);
        let data: OpenAiChatResponse =
            post_json(&self.client, &url, &self.api_key, &body, self.timeout).await?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("no choices in OpenAI response".into()))?;

        Ok(Message::assistant(choice.message.content.unwrap_or_default()))
    }
}

fn message_to_openai(msg: &Message) -> OpenAiMessage<'_> {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    OpenAiMessage {
        role,
        content: &msg.content,
    }
}

// OpenAI API wire types (internal)

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiReply,
}

#[derive(Deserialize)]
struct OpenAiReply {
    content: Option<String>,
}
