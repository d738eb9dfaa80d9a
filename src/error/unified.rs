//! Unified error classification.

/// Broad error category used to route logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Network,
    Timeout,
    Server,
    Api,
    Malformed,
    Serialization,
    Validation,
    Persistence,
}

impl ErrorCategory {
    /// Whether a later attempt at the same operation could succeed.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::Server)
    }
}
