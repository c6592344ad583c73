use super::error::ConfigError;
use super::loader::{FileConfig, load_file};
use crate::application::agent::AgentOptions;
use crate::constants::{
    DEFAULT_API_KEY_ENV, DEFAULT_MAX_STEPS, DEFAULT_MODEL_TIMEOUT_SECS, DEFAULT_SYSTEM_PROMPT,
    ENV_BASE_URL, ENV_MODEL, ENV_SYSTEM_PROMPT,
};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub system_prompt: String,
    pub max_steps: usize,
    pub parallel_tools: bool,
    /// `None` disables the model timeout.
    pub model_timeout: Option<Duration>,
}

impl AppConfig {
    /// Load from the config file and the process environment.
    pub fn load(path: Option<&Path>, model_override: Option<String>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| env::var(key).ok(), model_override)
    }

    pub fn load_with<F>(
        path: Option<&Path>,
        lookup: F,
        model_override: Option<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = load_file(path)?;
        Self::resolve(file, lookup, model_override)
    }

    /// Layers file values, then environment values, then the CLI override.
    pub fn resolve<F>(
        file: FileConfig,
        lookup: F,
        model_override: Option<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let model = model_override
            .filter(|value| !value.trim().is_empty())
            .or_else(|| lookup(ENV_MODEL))
            .or(file.model)
            .ok_or(ConfigError::MissingModel)?;
        let base_url = lookup(ENV_BASE_URL)
            .or(file.base_url)
            .ok_or(ConfigError::MissingBaseUrl)?;
        let api_key_env = file
            .api_key_env
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = lookup(&api_key_env);
        let system_prompt = lookup(ENV_SYSTEM_PROMPT)
            .or(file.system_prompt)
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let max_steps = file.max_steps.unwrap_or(DEFAULT_MAX_STEPS);
        if max_steps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_steps",
                reason: "must be at least 1".into(),
            });
        }
        let model_timeout = match file.model_timeout_secs.unwrap_or(DEFAULT_MODEL_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            model,
            base_url,
            api_key,
            system_prompt,
            max_steps,
            parallel_tools: file.parallel_tools.unwrap_or(false),
            model_timeout,
        })
    }

    pub fn agent_options(&self) -> AgentOptions {
        AgentOptions::new(self.model.clone())
            .with_max_steps(self.max_steps)
            .with_parallel_tools(self.parallel_tools)
            .with_model_timeout(self.model_timeout)
    }
}
