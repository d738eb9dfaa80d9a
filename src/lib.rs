//! Ultron: autonomous LLM control loop for remote turtles.
//!
//! Polls a turtle's state over HTTP, asks a chat backend what to do next,
//! extracts the Lua payload from the reply and posts it back to the turtle,
//! until the model reports the task complete.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ultron::prelude::*;
//!
//! # async fn example(config: ResolvedConfig) -> ultron::error::Result<()> {
//! let backend = create_backend(&config.backend)?;
//! let gateway = TurtleGateway::new(&config.gateway).map_err(ConfigError::HttpClient)?;
//! let store = load_or_seed(
//!     &config.loop_settings.history_path,
//!     &config.system_prompt,
//!     config.initial_task.as_deref(),
//! );
//! let mut orchestrator = Orchestrator::new(
//!     Arc::from(backend),
//!     Arc::new(gateway),
//!     store,
//!     config.loop_settings.clone(),
//! );
//! let outcome = orchestrator.run().await;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod orchestrator;
pub mod prelude;
pub mod provider;
pub mod sanitize;
pub mod types;
pub mod util;
