//! Decoder for OpenAI-compatible `chat.completion.chunk` SSE payloads.
//!
//! Content deltas are surfaced as they arrive. Tool call fragments are
//! accumulated by index and released as one [`ModelEvent::ToolCalls`] when the
//! stream finishes, because argument text is only valid JSON once complete.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{trace, warn};
use uuid::Uuid;

use super::types::{ModelError, ModelEvent};
use crate::types::ToolCallRequest;

pub const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: Option<usize>,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

#[derive(Debug)]
pub struct StreamDecoder {
    provider: String,
    calls: BTreeMap<usize, PartialCall>,
    last_index: Option<usize>,
    finished: bool,
}

impl StreamDecoder {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            calls: BTreeMap::new(),
            last_index: None,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one SSE `data` payload.
    pub fn push(&mut self, data: &str) -> Result<Vec<ModelEvent>, ModelError> {
        let data = data.trim();
        trace!(provider = %self.provider, data, "SSE payload");
        if data == DONE_MARKER {
            return self.finish();
        }
        if data.is_empty() || self.finished {
            return Ok(Vec::new());
        }

        let payload: Value = serde_json::from_str(data).map_err(|error| {
            ModelError::invalid_response(&self.provider, format!("unparseable chunk: {error}"))
        })?;
        if let Some(message) = api_error_message(&payload) {
            return Err(ModelError::invalid_response(&self.provider, message));
        }
        let chunk: Chunk = serde_json::from_value(payload).map_err(|error| {
            ModelError::invalid_response(&self.provider, format!("unexpected chunk shape: {error}"))
        })?;

        let mut events = Vec::new();
        for delta in chunk.choices.into_iter().filter_map(|choice| choice.delta) {
            if let Some(content) = delta.content.filter(|text| !text.is_empty()) {
                events.push(ModelEvent::Content(content));
            }
            for fragment in delta.tool_calls.unwrap_or_default() {
                self.accumulate(fragment);
            }
        }
        Ok(events)
    }

    /// Flush accumulated tool calls. Later calls return nothing.
    pub fn finish(&mut self) -> Result<Vec<ModelEvent>, ModelError> {
        if self.finished {
            return Ok(Vec::new());
        }
        self.finished = true;
        if self.calls.is_empty() {
            return Ok(Vec::new());
        }

        let mut requests = Vec::with_capacity(self.calls.len());
        for (index, call) in std::mem::take(&mut self.calls) {
            if call.name.is_empty() {
                return Err(ModelError::invalid_response(
                    &self.provider,
                    format!("tool call at index {index} has no function name"),
                ));
            }
            let id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
            requests.push(ToolCallRequest::new(id, call.name, parse_arguments(&call.arguments)));
        }
        Ok(vec![ModelEvent::ToolCalls(requests)])
    }

    fn accumulate(&mut self, fragment: ToolCallDelta) {
        let index = match fragment.index {
            Some(index) => index,
            None => match (&fragment.id, self.last_index) {
                (Some(id), Some(last))
                    if self.calls.get(&last).and_then(|call| call.id.as_ref()) != Some(id) =>
                {
                    self.calls.len()
                }
                (_, Some(last)) => last,
                (_, None) => 0,
            },
        };
        self.last_index = Some(index);

        let call = self.calls.entry(index).or_default();
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            call.id = Some(id);
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name {
                call.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                call.arguments.push_str(&arguments);
            }
        }
    }
}

/// Empty text means no arguments. Text that is not valid JSON is passed through
/// as a string so the tool guard can report it back to the model.
fn parse_arguments(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|error| {
        warn!(%error, "Tool call arguments are not valid JSON");
        Value::String(raw.to_string())
    })
}

fn api_error_message(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    if error.is_null() {
        return None;
    }
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("provider reported an error during streaming".to_string())
}
