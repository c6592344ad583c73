//! Message adapters - convert the transcript and tool catalog to wire formats

use crate::application::tooling::ToolSpec;
use crate::types::{ChatMessage, ToolCallRequest};
use serde_json::{Value, json};

/// Adapter for converting messages to provider API formats
pub struct MessageAdapter;

impl MessageAdapter {
    /// Convert messages to OpenAI chat-completions format
    pub fn to_openai_format(messages: &[ChatMessage]) -> Vec<Value> {
        messages.iter().map(Self::openai_message).collect()
    }

    /// Convert the tool catalog to OpenAI `tools` entries
    pub fn tools_to_openai(tools: &[ToolSpec]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect()
    }

    fn openai_message(message: &ChatMessage) -> Value {
        let role = message.role().as_str();
        match message {
            ChatMessage::Assistant {
                content,
                tool_calls,
            } if !tool_calls.is_empty() => {
                let content = if content.is_empty() {
                    Value::Null
                } else {
                    json!(content)
                };
                json!({
                    "role": role,
                    "content": content,
                    "tool_calls": tool_calls.iter().map(Self::openai_tool_call).collect::<Vec<_>>(),
                })
            }
            ChatMessage::Tool(result) => json!({
                "role": role,
                "tool_call_id": result.call_id,
                "content": result.content,
            }),
            other => json!({"role": role, "content": other.content()}),
        }
    }

    fn openai_tool_call(call: &ToolCallRequest) -> Value {
        let arguments = match &call.arguments {
            Value::String(raw) => raw.clone(),
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        };
        json!({
            "id": call.id,
            "type": "function",
            "function": {"name": call.name, "arguments": arguments},
        })
    }
}
