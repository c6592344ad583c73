use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::errors::AgentError;
use super::models::{AgentOptions, AgentStep, TurnOutcome};
use crate::application::streaming::{OutputSink, StreamCollector};
use crate::application::tooling::{Dispatch, ToolGuard, ToolSpec};
use crate::infrastructure::model::{ModelEvent, ModelProvider, ModelRequest};
use crate::types::{ToolCallRequest, Transcript};

/// Drives model round-trips and tool dispatch until the model answers directly.
pub struct Agent<P: ModelProvider> {
    provider: Arc<P>,
    guard: ToolGuard,
    catalog: Vec<ToolSpec>,
    options: AgentOptions,
}

/// Text and tool requests produced by one model round-trip.
struct ModelReply {
    content: String,
    tool_calls: Vec<ToolCallRequest>,
}

impl<P: ModelProvider> Agent<P> {
    pub fn new(provider: Arc<P>, guard: ToolGuard, options: AgentOptions) -> Self {
        let catalog = guard.registry().catalog();
        Self {
            provider,
            guard,
            catalog,
            options,
        }
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn catalog(&self) -> &[ToolSpec] {
        &self.catalog
    }

    /// Runs one user turn against `transcript`, which must already end with the
    /// user's message. Model text is streamed to `sink` as it arrives.
    pub async fn run_turn(
        &self,
        transcript: &mut Transcript,
        sink: &mut dyn OutputSink,
    ) -> Result<TurnOutcome, AgentError> {
        info!(model = %self.options.model, "Agent turn started");
        let mut steps = Vec::new();

        for round in 1..=self.options.max_steps {
            debug!(round, messages = transcript.len(), "Submitting transcript to model");
            let reply = self.round_trip(transcript, sink).await?;

            if reply.tool_calls.is_empty() {
                info!(rounds = round, tools = steps.len(), "Agent returned final response");
                transcript.push_assistant(reply.content.clone(), Vec::new());
                return Ok(TurnOutcome::Completed {
                    response: reply.content,
                    steps,
                });
            }

            info!(count = reply.tool_calls.len(), "Model requested tool execution");
            transcript.push_assistant(reply.content, reply.tool_calls.clone());

            if let Some(message) = self
                .dispatch_batch(&reply.tool_calls, transcript, &mut steps)
                .await
            {
                info!("Turn terminated by tool");
                return Ok(TurnOutcome::Terminated { message });
            }
        }

        warn!(max_steps = self.options.max_steps, "Agent exceeded step limit");
        Err(AgentError::StepLimit(self.options.max_steps))
    }

    async fn round_trip(
        &self,
        transcript: &Transcript,
        sink: &mut dyn OutputSink,
    ) -> Result<ModelReply, AgentError> {
        let request = ModelRequest {
            model: self.options.model.clone(),
            messages: transcript.messages().to_vec(),
            tools: self.catalog.clone(),
        };
        let mut stream = self.within_timeout(self.provider.converse(request)).await??;

        let mut collector = StreamCollector::new(sink);
        let mut tool_calls = Vec::new();
        while let Some(event) = self.within_timeout(stream.next()).await? {
            match event? {
                ModelEvent::Content(fragment) => collector.push(&fragment).await?,
                ModelEvent::ToolCalls(calls) => tool_calls.extend(calls),
            }
        }

        Ok(ModelReply {
            content: collector.finish(),
            tool_calls,
        })
    }

    /// Appends one tool result per request, in request order. Returns the
    /// termination message if a request ended the session.
    ///
    /// In parallel mode a request for a session-ending tool is a barrier: the
    /// requests before it run concurrently, it then runs alone, and nothing
    /// after it starts unless it completed without ending the session.
    async fn dispatch_batch(
        &self,
        requests: &[ToolCallRequest],
        transcript: &mut Transcript,
        steps: &mut Vec<AgentStep>,
    ) -> Option<String> {
        if !self.options.parallel_tools {
            for request in requests {
                let dispatch = self.guard.dispatch(request).await;
                if let Some(message) = record(request, dispatch, transcript, steps) {
                    return Some(message);
                }
            }
            return None;
        }

        let mut remaining = requests;
        while !remaining.is_empty() {
            let barrier = remaining
                .iter()
                .position(|request| self.guard.ends_session(request))
                .unwrap_or(remaining.len());
            let (concurrent, rest) = remaining.split_at(barrier);

            let dispatches =
                join_all(concurrent.iter().map(|request| self.guard.dispatch(request))).await;
            for (request, dispatch) in concurrent.iter().zip(dispatches) {
                if let Some(message) = record(request, dispatch, transcript, steps) {
                    return Some(message);
                }
            }

            let Some((request, rest)) = rest.split_first() else {
                break;
            };
            let dispatch = self.guard.dispatch(request).await;
            if let Some(message) = record(request, dispatch, transcript, steps) {
                return Some(message);
            }
            remaining = rest;
        }
        None
    }

    async fn within_timeout<F: Future>(&self, future: F) -> Result<F::Output, AgentError> {
        match self.options.model_timeout {
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| AgentError::Timeout(limit)),
            None => Ok(future.await),
        }
    }
}

fn record(
    request: &ToolCallRequest,
    dispatch: Dispatch,
    transcript: &mut Transcript,
    steps: &mut Vec<AgentStep>,
) -> Option<String> {
    match dispatch {
        Dispatch::Completed(result) => {
            steps.push(AgentStep {
                tool: request.name.clone(),
                arguments: request.arguments.clone(),
                status: result.status,
                content: result.content.clone(),
            });
            transcript.push_tool_result(result);
            None
        }
        Dispatch::Terminate { call_id, message } => {
            info!(tool = %request.name, %call_id, "Tool ended the session");
            Some(message)
        }
    }
}
