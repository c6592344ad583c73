use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    name = "git-agent",
    version,
    about = "Conversational agent that operates Git repositories through tools"
)]
pub struct Cli {
    /// Configuration file (default: config/agent.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Environment file loaded before reading variables (default: .env)
    #[arg(long)]
    pub env_file: Option<PathBuf>,
    /// Model identifier, overriding DEFAULT_MODEL and the config file
    #[arg(long)]
    pub model: Option<String>,
}
