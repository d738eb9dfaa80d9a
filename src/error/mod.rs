//! Error types for Ultron.

pub mod unified;

pub use unified::ErrorCategory;

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration failure. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to encode default config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("no config found; defaults written to {0}, edit it and restart")]
    DefaultsWritten(PathBuf),

    #[error("unknown backend '{0}' (expected openai, deepseek or custom)")]
    UnknownBackend(String),

    #[error("missing {field} for backend '{backend}'")]
    MissingField { backend: String, field: &'static str },

    #[error("placeholder credentials in use for backend '{0}'; update the config file")]
    PlaceholderCredentials(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Failure of a single chat completion call.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("failed to encode request: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Status { status, .. } => match status {
                429 | 500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Malformed(_) => ErrorCategory::Malformed,
            Self::Serialization(_) => ErrorCategory::Serialization,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category().is_transient()
    }
}

/// Failure talking to the turtle API.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("turtle API returned status {0}")]
    Remote(u16),

    #[error("invalid command batch: {0}")]
    Validation(String),
}

impl GatewayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(e) if e.is_timeout() => ErrorCategory::Timeout,
            Self::Network(_) => ErrorCategory::Network,
            Self::Remote(500..=599) => ErrorCategory::Server,
            Self::Remote(_) => ErrorCategory::Api,
            Self::Validation(_) => ErrorCategory::Validation,
        }
    }
}

/// Failure reading or writing the durable conversation file.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no saved conversation at {0}")]
    NotFound(PathBuf),

    #[error("conversation file {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode conversation: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("conversation file I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Persistence
    }
}

/// Top-level error for everything the binary can surface.
#[derive(Error, Debug)]
pub enum UltronError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("persistence error: {0}")]
    Store(#[from] StoreError),
}

impl UltronError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Backend(e) => e.category(),
            Self::Gateway(e) => e.category(),
            Self::Store(e) => e.category(),
        }
    }

    /// Only configuration failures stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, UltronError>;
