//! Error-isolating wrapper around every tool invocation.
//!
//! Whatever happens inside a tool (bad arguments, a failing git command, a
//! missing file, even a panic) the caller receives exactly one
//! [`ToolResultMessage`]. The only outcome that escapes normal handling is
//! [`Dispatch::Terminate`], raised by the session-ending tool.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, warn};

use super::error::ToolInvokeError;
use super::registry::{ToolOutput, ToolRegistry};
use crate::constants::TOOL_ERROR_PREFIX;
use crate::types::{ToolCallRequest, ToolResultMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Completed(ToolResultMessage),
    Terminate { call_id: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ToolGuard {
    registry: Arc<ToolRegistry>,
}

impl ToolGuard {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// True when `request` targets a tool that may close the session.
    pub fn ends_session(&self, request: &ToolCallRequest) -> bool {
        self.registry.ends_session(&request.name)
    }

    pub async fn dispatch(&self, request: &ToolCallRequest) -> Dispatch {
        debug!(tool = %request.name, call_id = %request.id, "Dispatching tool call");
        match self.invoke(request).await {
            Ok(ToolOutput::Text(content)) => {
                info!(tool = %request.name, success = true, "Tool executed");
                Dispatch::Completed(ToolResultMessage::success(
                    &request.id,
                    &request.name,
                    content,
                ))
            }
            Ok(ToolOutput::Terminate(message)) => {
                info!(tool = %request.name, "Tool requested session termination");
                Dispatch::Terminate {
                    call_id: request.id.clone(),
                    message,
                }
            }
            Err(error) => {
                warn!(tool = %request.name, %error, "Tool execution failed");
                Dispatch::Completed(ToolResultMessage::error(
                    &request.id,
                    &request.name,
                    format_tool_error(&error),
                ))
            }
        }
    }

    async fn invoke(&self, request: &ToolCallRequest) -> Result<ToolOutput, ToolInvokeError> {
        let descriptor = self
            .registry
            .resolve(&request.name)
            .map_err(|_| ToolInvokeError::UnknownTool(request.name.clone()))?;
        let args = descriptor
            .schema()
            .coerce(descriptor.name(), &request.arguments)?;
        let handler = descriptor.handler();

        match AssertUnwindSafe(handler.invoke(args)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(ToolInvokeError::execution(
                descriptor.name(),
                format!("tool panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

/// Model-facing diagnostic for a failed tool call.
pub fn format_tool_error(error: &ToolInvokeError) -> String {
    format!("{TOOL_ERROR_PREFIX} ({error})")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
