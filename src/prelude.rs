//! Convenience re-exports for common use.

pub use crate::config::{AppConfig, ResolvedConfig};
pub use crate::conversation::ConversationStore;
pub use crate::error::{BackendError, ConfigError, GatewayError, Result, StoreError, UltronError};
pub use crate::gateway::{AgentGateway, CommandBatch, TurtleGateway};
pub use crate::orchestrator::{load_or_seed, LoopSettings, LoopState, Orchestrator, RunOutcome};
pub use crate::provider::{create_backend, BackendConfig, BackendKind, ChatBackend};
pub use crate::types::{Conversation, Message, Role};
