pub mod app;
pub mod error;
pub mod loader;

pub use app::AppConfig;
pub use error::ConfigError;
pub use loader::{FileConfig, ensure_env_loaded};
