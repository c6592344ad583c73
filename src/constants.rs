pub const TOOL_ERROR_PREFIX: &str = "Tool error: Please check your input and try again.";
pub const QUIT_MESSAGE: &str = "Conversation ended by Agent.";

pub const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";
pub const DEFAULT_ENV_FILE: &str = ".env";

pub const ENV_MODEL: &str = "DEFAULT_MODEL";
pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_SYSTEM_PROMPT: &str = "SYSTEM_PROMPT";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful git assistant. Use the available tools \
to inspect and change git repositories and files on behalf of the user. Call quit_conversation \
when the user wants to end the conversation.";

pub const DEFAULT_MAX_STEPS: usize = 16;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

pub const PROMPT: &str = ">> ";
