//! OpenAI-compatible streaming client

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use reqwest::StatusCode;
use reqwest_eventsource::{Event, EventSource, retry::Never};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::base::HttpClientBase;
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::decoder::StreamDecoder;
use crate::infrastructure::model::traits::ModelProvider;
use crate::infrastructure::model::types::{ModelError, ModelEvent, ModelRequest, ModelStream};

const PROVIDER_ID: &str = "openai";
const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Client for any endpoint speaking the OpenAI chat-completions protocol.
#[derive(Clone)]
pub struct OpenAIClient {
    base: HttpClientBase,
}

impl OpenAIClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base: HttpClientBase::new(PROVIDER_ID.to_string(), base_url.into(), api_key),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAIClient {
    async fn converse(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        let url = self.base.build_url(CHAT_COMPLETIONS_PATH);
        let tools = MessageAdapter::tools_to_openai(&request.tools);
        let payload = OpenAIRequest {
            model: request.model.clone(),
            messages: MessageAdapter::to_openai_format(&request.messages),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
            stream: true,
        };

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streaming request to OpenAI-compatible provider"
        );

        let mut source = EventSource::new(self.base.post_json(&url, &payload)).map_err(|error| {
            ModelError::invalid_response(&self.base.id, format!("cannot build request: {error}"))
        })?;
        source.set_retry_policy(Box::new(Never));

        let state = StreamState {
            provider: self.base.id.clone(),
            has_api_key: self.base.has_api_key(),
            source,
            decoder: StreamDecoder::new(self.base.id.clone()),
            pending: VecDeque::new(),
            closed: false,
        };
        Ok(stream::unfold(state, StreamState::next_event).boxed())
    }
}

struct StreamState {
    provider: String,
    has_api_key: bool,
    source: EventSource,
    decoder: StreamDecoder,
    pending: VecDeque<Result<ModelEvent, ModelError>>,
    closed: bool,
}

impl StreamState {
    async fn next_event(mut self) -> Option<(Result<ModelEvent, ModelError>, Self)> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some((item, self));
            }
            if self.closed {
                return None;
            }

            match self.source.next().await {
                Some(Ok(Event::Open)) => debug!(provider = %self.provider, "Stream opened"),
                Some(Ok(Event::Message(message))) => {
                    let decoded = self.decoder.push(&message.data);
                    self.enqueue(decoded);
                    if self.decoder.is_finished() {
                        self.close();
                    }
                }
                None | Some(Err(reqwest_eventsource::Error::StreamEnded)) => {
                    debug!(provider = %self.provider, "Stream ended");
                    let flushed = self.decoder.finish();
                    self.enqueue(flushed);
                    self.close();
                }
                Some(Err(error)) => {
                    let error = map_error(&self.provider, self.has_api_key, error).await;
                    warn!(provider = %self.provider, %error, "Stream failed");
                    self.pending.push_back(Err(error));
                    self.close();
                }
            }
        }
    }

    fn enqueue(&mut self, decoded: Result<Vec<ModelEvent>, ModelError>) {
        match decoded {
            Ok(events) => self.pending.extend(events.into_iter().map(Ok)),
            Err(error) => {
                self.pending.push_back(Err(error));
                self.close();
            }
        }
    }

    fn close(&mut self) {
        self.source.close();
        self.closed = true;
    }
}

async fn map_error(provider: &str, has_api_key: bool, error: reqwest_eventsource::Error) -> ModelError {
    match error {
        reqwest_eventsource::Error::Transport(source) => {
            ModelError::network(provider, source)
        }
        reqwest_eventsource::Error::InvalidStatusCode(status, _)
            if !has_api_key
                && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) =>
        {
            ModelError::missing_api_key(provider)
        }
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .pointer("/error/message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(body);
            ModelError::stream(
                provider,
                format!("HTTP {}: {}", status.as_u16(), detail.trim()),
            )
        }
        reqwest_eventsource::Error::InvalidContentType(content_type, _) => {
            ModelError::invalid_response(
                provider,
                format!(
                    "expected an event stream, got {}",
                    content_type.to_str().unwrap_or("<binary>")
                ),
            )
        }
        other => ModelError::stream(provider, other.to_string()),
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    stream: bool,
}
