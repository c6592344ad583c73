use std::time::Duration;

use crate::constants::DEFAULT_MAX_STEPS;
use crate::types::ToolStatus;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub model: String,
    /// Model round-trips allowed in a single turn.
    pub max_steps: usize,
    /// Dispatch a batch of tool calls concurrently instead of one by one.
    pub parallel_tools: bool,
    pub model_timeout: Option<Duration>,
}

impl AgentOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_steps: DEFAULT_MAX_STEPS,
            parallel_tools: false,
            model_timeout: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_parallel_tools(mut self, parallel_tools: bool) -> Self {
        self.parallel_tools = parallel_tools;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.model_timeout = timeout;
        self
    }
}

/// Record of one tool invocation made during a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub tool: String,
    pub arguments: Value,
    pub status: ToolStatus,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed {
        response: String,
        steps: Vec<AgentStep>,
    },
    /// The terminate tool ran; the session must end.
    Terminated { message: String },
}
