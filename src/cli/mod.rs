//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::provider::BackendKind;

/// Ultron: drive a turtle with a language model until the task is done.
#[derive(Parser, Debug)]
#[command(name = "ultron", version, about = "Autonomous LLM control loop for turtles")]
pub struct Cli {
    /// Path to the TOML config file (created with defaults if missing)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Enable debug logging regardless of the config file
    #[arg(short, long)]
    pub debug: bool,

    /// Override the configured backend (openai, deepseek, custom)
    #[arg(short, long)]
    pub backend: Option<BackendKind>,

    /// Read operator commands from stdin and feed them to the model
    #[arg(short, long)]
    pub interactive: bool,
}
