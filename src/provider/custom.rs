//! Generic backend for any self-hosted chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BackendError;
use crate::types::Message;

use super::http::{endpoint, post_json};
use super::ChatBackend;

/// Backend for a user-supplied base URL; no default endpoint exists.
pub struct CustomBackend {
    client: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl CustomBackend {
    pub fn new(
        client: reqwest::Client,
        model: String,
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            model,
            api_key,
            base_url,
            timeout,
        }
    }
}

#[async_trait]
impl ChatBackend for CustomBackend {
    fn backend_name(&self) -> &str {
        "custom"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, conversation: &[Message]) -> Result<Message, BackendError> {
        let url = endpoint(&self.base_url, "chat/completions");
        debug!(model = %self.model, url = %url, "custom backend complete");

        let body = CustomRequest {
            model: &self.model,
            messages: conversation,
        };
        let data: CustomResponse =
            post_json(&self.client, &url, &self.api_key, &body, self.timeout).await?;

        let first = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("no choices in custom backend response".into()))?;

        Ok(Message::assistant(first.message.content))
    }
}

#[derive(Serialize)]
struct CustomRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct CustomResponse {
    #[serde(default)]
    choices: Vec<CustomChoice>,
}

#[derive(Deserialize)]
struct CustomChoice {
    message: CustomReply,
}

#[derive(Deserialize)]
struct CustomReply {
    #[serde(default)]
    content: String,
}
