use thiserror::Error;

/// Failure raised while preparing or running a single tool call.
///
/// Every variant is recoverable: the guard turns it into an error result the
/// model can read and act on.
#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("invalid arguments for tool '{tool}': {reason}")]
    Argument { tool: String, reason: String },
    #[error("tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },
    #[error("unknown tool requested: {0}")]
    UnknownTool(String),
}

impl ToolInvokeError {
    pub fn argument(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Argument {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Registry misconfiguration. Raised while the tool set is assembled at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
    #[error("tool '{0}' is not registered")]
    UnknownTool(String),
}
