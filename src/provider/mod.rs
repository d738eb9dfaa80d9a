//! Chat backend trait and implementations.

pub mod custom;
pub mod deepseek;
pub mod http;
pub mod openai;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, ConfigError};
use crate::types::Message;

/// Reference per-call timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Core trait implemented by all chat backends.
///
/// `complete` receives a read-only snapshot and returns exactly one
/// assistant message built from the first choice of the reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name (e.g., "openai", "deepseek").
    fn backend_name(&self) -> &str;
    /// The model ID this backend instance serves.
    fn model_id(&self) -> &str;

    async fn complete(&self, conversation: &[Message]) -> Result<Message, BackendError>;
}

/// Which backend implementation to construct.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    OpenAi,
    DeepSeek,
    Custom,
}

/// Fully resolved backend selection; immutable after startup.
#[derive(Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("kind", &self.kind)
            .field("api_key", &"..")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Create the backend selected by `config`.
pub fn create_backend(config: &BackendConfig) -> Result<Box<dyn ChatBackend>, ConfigError> {
    let client = http::build_client(config.timeout).map_err(ConfigError::HttpClient)?;
    let model = config.model.clone();
    let api_key = config.api_key.clone();

    match config.kind {
        BackendKind::OpenAi => Ok(Box::new(openai::OpenAiBackend::new(
            client,
            model,
            api_key,
            config.base_url.clone(),
            config.timeout,
        ))),
        BackendKind::DeepSeek => Ok(Box::new(deepseek::DeepSeekBackend::new(
            client,
            model,
            api_key,
            config.base_url.clone(),
            config.timeout,
        ))),
        BackendKind::Custom => {
            let base_url = config
                .base_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingField {
                    backend: BackendKind::Custom.to_string(),
                    field: "url",
                })?;
            Ok(Box::new(custom::CustomBackend::new(
                client,
                model,
                api_key,
                base_url,
                config.timeout,
            )))
        }
    }
}
