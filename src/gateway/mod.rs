//! HTTP gateway to the turtle control API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::GatewayError;

/// Default turtle API when none is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:3300";

/// State polling and command submission for one turtle.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Fetch the turtle's current state as an opaque blob.
    async fn fetch_state(&self) -> Result<String, GatewayError>;

    /// Submit one batch of commands.
    async fn submit(&self, batch: &CommandBatch) -> Result<(), GatewayError>;
}

/// Ordered commands sent to the turtle in one POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBatch(Vec<String>);

impl CommandBatch {
    pub fn new(commands: Vec<String>) -> Self {
        Self(commands)
    }

    pub fn single(command: impl Into<String>) -> Self {
        Self(vec![command.into()])
    }

    /// Interpret a sanitized reply as a batch.
    ///
    /// A JSON array of strings becomes one command per element; anything
    /// else is sent verbatim as a single command.
    pub fn from_reply(text: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(text) {
            Ok(commands) => Self(commands),
            Err(_) => Self::single(text),
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.0
    }

    /// Encode as the JSON array body the turtle API expects.
    pub fn to_json(&self) -> Result<String, GatewayError> {
        if self.0.is_empty() {
            return Err(GatewayError::Validation("batch contains no commands".into()));
        }
        serde_json::to_string(&self.0).map_err(|e| GatewayError::Validation(e.to_string()))
    }
}

/// Where the turtle API lives.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub turtle_id: String,
    pub timeout: Duration,
}

/// [`AgentGateway`] over the turtle HTTP API.
pub struct TurtleGateway {
    client: reqwest::Client,
    url: String,
}

impl TurtleGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: turtle_url(&config.base_url, &config.turtle_id),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AgentGateway for TurtleGateway {
    async fn fetch_state(&self) -> Result<String, GatewayError> {
        debug!(url = %self.url, "fetching turtle state");
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(GatewayError::Network)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(GatewayError::Network)?;
        debug!(status, bytes = body.len(), "turtle state received");
        Ok(body)
    }

    async fn submit(&self, batch: &CommandBatch) -> Result<(), GatewayError> {
        let body = batch.to_json()?;
        debug!(url = %self.url, commands = batch.commands().len(), "submitting command batch");

        let resp = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(GatewayError::Network)?;

        let status = resp.status().as_u16();
        match resp.text().await {
            Ok(text) => debug!(status, response = %text, "turtle API replied"),
            Err(e) => debug!(status, error = %e, "turtle API reply body unreadable"),
        }

        if status != 200 {
            return Err(GatewayError::Remote(status));
        }
        Ok(())
    }
}

fn turtle_url(base_url: &str, turtle_id: &str) -> String {
    format!("{}/api/turtle/{}", base_url.trim_end_matches('/'), turtle_id)
}
