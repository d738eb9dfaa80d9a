//! Configuration: `config.toml` on disk, resolved once at startup.
//!
//! Resolution order for credentials:
//! 1. The key in the selected `[ai_provider.<backend>]` table
//! 2. The backend's environment variable (`.env` is honored)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::gateway::{GatewayConfig, DEFAULT_API_URL};
use crate::orchestrator::LoopSettings;
use crate::provider::{BackendConfig, BackendKind};
use crate::sanitize::DEFAULT_COMPLETION_MARKER;

/// Operating prompt written out when the prompt file does not exist.
pub const DEFAULT_PROMPT: &str = include_str!("prompt.md");

const DEFAULT_PROMPT_FILE: &str = "./prompt.md";
const PLACEHOLDER_KEY: &str = "default-key";
const PLACEHOLDER_MODEL: &str = "default-model";

/// Raw contents of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt_file: String,
    pub ai_provider: AiProviderConfig,
    pub ultron: UltronConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProviderConfig {
    pub backend: String,
    #[serde(default)]
    pub openai: ApiConfig,
    #[serde(default)]
    pub deepseek: ApiConfig,
    #[serde(default)]
    pub custom: ApiConfig,
}

/// Credentials and endpoint for one backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub model: String,
}

/// Turtle API location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UltronConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default = "default_turtle_id")]
    pub turtle_id: String,
}

/// Loop timing and file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub backoff_secs: u64,
    pub settle_secs: u64,
    pub request_timeout_secs: u64,
    pub history_file: PathBuf,
    pub initial_task_file: PathBuf,
    pub completion_marker: String,
    pub log_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backoff_secs: 5,
            settle_secs: 5,
            request_timeout_secs: 30,
            history_file: PathBuf::from("conversation_history.json"),
            initial_task_file: PathBuf::from("init-task.txt"),
            completion_marker: DEFAULT_COMPLETION_MARKER.to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

fn default_turtle_id() -> String {
    "0".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            prompt_file: DEFAULT_PROMPT_FILE.to_string(),
            ai_provider: AiProviderConfig {
                backend: BackendKind::OpenAi.to_string(),
                openai: ApiConfig {
                    url: None,
                    key: PLACEHOLDER_KEY.to_string(),
                    model: PLACEHOLDER_MODEL.to_string(),
                },
                deepseek: ApiConfig::default(),
                custom: ApiConfig::default(),
            },
            ultron: UltronConfig {
                api_url: format!("{DEFAULT_API_URL}/"),
                turtle_id: default_turtle_id(),
            },
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Everything the control loop needs, validated.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backend: BackendConfig,
    pub gateway: GatewayConfig,
    pub system_prompt: String,
    pub initial_task: Option<String>,
    pub loop_settings: LoopSettings,
}

impl AppConfig {
    /// Read `path`, or write a default config there and fail.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Self::default().write(path)?;
                return Err(ConfigError::DefaultsWritten(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve against the process environment.
    pub fn resolve(&self, backend_override: Option<BackendKind>) -> Result<ResolvedConfig, ConfigError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        self.resolve_with(backend_override, |var| std::env::var(var).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        &self,
        backend_override: Option<BackendKind>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let kind = match backend_override {
            Some(kind) => kind,
            None => self
                .ai_provider
                .backend
                .trim()
                .parse::<BackendKind>()
                .map_err(|_| ConfigError::UnknownBackend(self.ai_provider.backend.clone()))?,
        };
        let timeout = Duration::from_secs(self.runtime.request_timeout_secs.max(1));
        let backend = self.backend_config(kind, timeout, &env)?;

        let prompt_path = if self.prompt_file.trim().is_empty() {
            PathBuf::from(DEFAULT_PROMPT_FILE)
        } else {
            PathBuf::from(&self.prompt_file)
        };
        let system_prompt = load_prompt(&prompt_path)?;

        Ok(ResolvedConfig {
            backend,
            gateway: GatewayConfig {
                base_url: clean_api_url(&self.ultron.api_url),
                turtle_id: self.ultron.turtle_id.clone(),
                timeout,
            },
            system_prompt,
            initial_task: load_initial_task(&self.runtime.initial_task_file),
            loop_settings: LoopSettings {
                backoff: Duration::from_secs(self.runtime.backoff_secs.max(1)),
                settle: Duration::from_secs(self.runtime.settle_secs),
                completion_marker: self.runtime.completion_marker.clone(),
                history_path: self.runtime.history_file.clone(),
            },
        })
    }

    fn backend_config(
        &self,
        kind: BackendKind,
        timeout: Duration,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<BackendConfig, ConfigError> {
        let (section, env_var) = match kind {
            BackendKind::OpenAi => (&self.ai_provider.openai, "OPENAI_API_KEY"),
            BackendKind::DeepSeek => (&self.ai_provider.deepseek, "DEEPSEEK_API_KEY"),
            BackendKind::Custom => (&self.ai_provider.custom, "CUSTOM_API_KEY"),
        };
        let missing = |field| ConfigError::MissingField {
            backend: kind.to_string(),
            field,
        };

        if section.key == PLACEHOLDER_KEY || section.model == PLACEHOLDER_MODEL {
            return Err(ConfigError::PlaceholderCredentials(kind.to_string()));
        }

        let api_key = if section.key.trim().is_empty() {
            env(env_var).unwrap_or_default()
        } else {
            section.key.trim().to_string()
        };
        if api_key.is_empty() && kind != BackendKind::Custom {
            return Err(missing("key"));
        }
        if section.model.trim().is_empty() {
            return Err(missing("model"));
        }

        let base_url = section
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| url.trim_end_matches('/').to_string());
        if kind == BackendKind::Custom && base_url.is_none() {
            return Err(missing("url"));
        }

        Ok(BackendConfig {
            kind,
            api_key,
            model: section.model.trim().to_string(),
            base_url,
            timeout,
        })
    }
}

/// Read the operating prompt, writing the built-in one first if absent.
pub fn load_prompt(path: &Path) -> Result<String, ConfigError> {
    if !path.exists() {
        warn!(path = %path.display(), "prompt file not found; writing default prompt");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, DEFAULT_PROMPT).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the one-shot initial task. Missing or unreadable files yield `None`.
pub fn load_initial_task(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(raw) => Some(raw.trim().to_string()).filter(|task| !task.is_empty()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no initial task file");
            None
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read initial task");
            None
        }
    }
}

fn clean_api_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        DEFAULT_API_URL.to_string()
    } else {
        url.to_string()
    }
}
