use super::error::ConfigError;
use crate::constants::{DEFAULT_CONFIG_PATH, DEFAULT_ENV_FILE};
use dotenvy::from_filename;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::{debug, warn};

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub system_prompt: Option<String>,
    pub max_steps: Option<usize>,
    pub parallel_tools: Option<bool>,
    pub model_timeout_secs: Option<u64>,
}

/// Loads variables from the env file once per process. Variables already
/// present in the environment are left untouched.
pub fn ensure_env_loaded(path: Option<&Path>) {
    ENV_LOADER.call_once(|| {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_ENV_FILE));
        match from_filename(path) {
            Ok(loaded) => debug!(path = %loaded.display(), "Loaded environment file"),
            Err(error) if error.not_found() => {
                debug!(path = %path.display(), "No environment file found")
            }
            Err(error) => warn!(path = %path.display(), %error, "Failed to load environment file"),
        }
    });
}

/// Reads the config file. An explicit path must exist; the default path is optional.
pub fn load_file(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    match path {
        Some(path) => read_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                read_config(default)
            } else {
                debug!(path = %default.display(), "No config file, using environment only");
                Ok(FileConfig::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
