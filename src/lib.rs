pub mod application;
pub mod cli;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, session, streaming, tooling};
pub use cli::Cli;
pub use config::AppConfig;
pub use domain::types;
pub use infrastructure::model;

use agent::Agent;
use model::OpenAIClient;
use session::{Session, SessionEnd};
use std::error::Error;
use std::sync::Arc;
use tokio::io::{self, BufReader};
use tooling::{ToolGuard, ToolRegistry};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<SessionEnd, Box<dyn Error>> {
    init_tracing();
    info!("Starting git-agent");
    debug!(
        config = ?cli.config,
        env_file = ?cli.env_file,
        model = ?cli.model,
        "CLI arguments parsed"
    );

    config::ensure_env_loaded(cli.env_file.as_deref());
    let app_config = AppConfig::load(cli.config.as_deref(), cli.model.clone())?;
    info!(
        model = %app_config.model,
        base_url = %app_config.base_url,
        max_steps = app_config.max_steps,
        parallel_tools = app_config.parallel_tools,
        "Configuration resolved"
    );

    let registry = Arc::new(ToolRegistry::builtin()?);
    debug!(tools = registry.len(), "Tool registry initialised");
    let provider = Arc::new(OpenAIClient::new(
        app_config.base_url.clone(),
        app_config.api_key.clone(),
    ));
    let agent = Agent::new(provider, ToolGuard::new(registry), app_config.agent_options());

    let mut session = Session::new(agent, app_config.system_prompt.clone());
    let stdin = BufReader::new(io::stdin());
    let end = session.run(stdin, io::stdout()).await?;
    info!(end = ?end, "Session finished");
    Ok(end)
}

/// Logs go to stderr so they never interleave with streamed answers on stdout.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
