use super::*;
use crate::application::streaming::BufferSink;
use crate::application::tooling::{
    Builtin, ParamKind, ParamSpec, ToolArgs, ToolDescriptor, ToolGuard, ToolHandler,
    ToolInvokeError, ToolOutput, ToolRegistry, ToolSchema,
};
use crate::constants::{QUIT_MESSAGE, TOOL_ERROR_PREFIX};
use crate::model::{ModelError, ModelEvent, ModelProvider, ModelRequest, ModelStream};
use crate::types::{ChatMessage, ToolCallRequest, ToolStatus, Transcript};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

enum Round {
    Events(Vec<Result<ModelEvent, ModelError>>),
    Fail(ModelError),
    Stall,
}

#[derive(Clone)]
struct ScriptedProvider {
    rounds: Arc<Mutex<VecDeque<Round>>>,
    recordings: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedProvider {
    fn new(rounds: Vec<Round>) -> Self {
        Self {
            rounds: Arc::new(Mutex::new(rounds.into())),
            recordings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn requests(&self) -> Vec<ModelRequest> {
        self.recordings.lock().await.clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn converse(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        self.recordings.lock().await.push(request);
        match self.rounds.lock().await.pop_front() {
            Some(Round::Events(events)) => Ok(futures::stream::iter(events).boxed()),
            Some(Round::Fail(error)) => Err(error),
            Some(Round::Stall) => Ok(futures::stream::pending().boxed()),
            None => Err(ModelError::invalid_response("scripted", "script exhausted")),
        }
    }
}

fn text(fragments: &[&str]) -> Round {
    Round::Events(
        fragments
            .iter()
            .map(|fragment| Ok(ModelEvent::Content(fragment.to_string())))
            .collect(),
    )
}

fn calls(requests: Vec<ToolCallRequest>) -> Round {
    Round::Events(vec![Ok(ModelEvent::ToolCalls(requests))])
}

fn echo_call(id: &str, text: &str, delay_ms: u64) -> ToolCallRequest {
    ToolCallRequest::new(id, "echo", json!({"text": text, "delay_ms": delay_ms}))
}

struct Echo;

#[async_trait]
impl ToolHandler for Echo {
    async fn invoke(&self, args: ToolArgs) -> Result<ToolOutput, ToolInvokeError> {
        let delay = args.integer("delay_ms")?;
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        Ok(ToolOutput::Text(format!("echo:{}", args.string("text")?)))
    }
}

struct MissingFile;

#[async_trait]
impl ToolHandler for MissingFile {
    async fn invoke(&self, args: ToolArgs) -> Result<ToolOutput, ToolInvokeError> {
        Err(ToolInvokeError::execution(
            args.tool(),
            "cannot read '/nope.txt': No such file or directory",
        ))
    }
}

/// Counts invocations so tests can see whether a tool ever ran.
struct Touch(Arc<AtomicUsize>);

#[async_trait]
impl ToolHandler for Touch {
    async fn invoke(&self, _args: ToolArgs) -> Result<ToolOutput, ToolInvokeError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(ToolOutput::Text("touched".into()))
    }
}

fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(ToolDescriptor::new(
            "echo",
            "Echo text after a delay.",
            ToolSchema::new()
                .param(ParamSpec::required("text", ParamKind::String))
                .param(ParamSpec::optional(
                    "delay_ms",
                    ParamKind::Integer,
                    Some(json!(0)),
                )),
            Arc::new(Echo),
        ))
        .unwrap();
    registry
        .register(ToolDescriptor::new(
            "file_read",
            "Always fails.",
            ToolSchema::new().param(ParamSpec::required("file_path", ParamKind::String)),
            Arc::new(MissingFile),
        ))
        .unwrap();
    registry
        .register(Builtin::QuitConversation.descriptor())
        .unwrap();
    registry
}

fn guard() -> ToolGuard {
    ToolGuard::new(Arc::new(registry()))
}

fn agent(provider: &ScriptedProvider, options: AgentOptions) -> Agent<ScriptedProvider> {
    Agent::new(Arc::new(provider.clone()), guard(), options)
}

fn transcript(prompt: &str) -> Transcript {
    let mut transcript = Transcript::new("system");
    transcript.push_user(prompt);
    transcript
}

fn tool_results(transcript: &Transcript) -> Vec<(String, String)> {
    transcript
        .messages()
        .iter()
        .filter_map(|message| match message {
            ChatMessage::Tool(result) => Some((result.call_id.clone(), result.content.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn direct_answer_makes_one_round_trip() {
    let provider = ScriptedProvider::new(vec![text(&["Your repo ", "is clean", "."])]);
    let agent = agent(&provider, AgentOptions::new("gpt-test"));
    let mut transcript = transcript("status?");
    let mut sink = BufferSink::new();

    let outcome = agent.run_turn(&mut transcript, &mut sink).await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Completed {
            response: "Your repo is clean.".into(),
            steps: Vec::new(),
        }
    );
    assert_eq!(sink.fragments(), ["Your repo ", "is clean", "."]);
    assert_eq!(transcript.len(), 3);
    assert_eq!(
        transcript.last(),
        Some(&ChatMessage::assistant("Your repo is clean."))
    );

    let requests = provider.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gpt-test");
    assert_eq!(requests[0].messages.len(), 2);
    let tool_names: Vec<&str> = requests[0].tools.iter().map(|tool| tool.name.as_str()).collect();
    assert_eq!(tool_names, vec!["echo", "file_read", "quit_conversation"]);
}

async fn assert_results_in_request_order(parallel: bool, count: usize) {
    let requests: Vec<ToolCallRequest> = (0..count)
        .map(|i| echo_call(&format!("call_{i}"), &format!("t{i}"), (count - i) as u64 * 15))
        .collect();
    let provider = ScriptedProvider::new(vec![calls(requests.clone()), text(&["done"])]);
    let agent = agent(
        &provider,
        AgentOptions::new("gpt-test").with_parallel_tools(parallel),
    );
    let mut transcript = transcript("echo please");

    let outcome = agent
        .run_turn(&mut transcript, &mut BufferSink::new())
        .await
        .unwrap();

    let expected: Vec<(String, String)> = (0..count)
        .map(|i| (format!("call_{i}"), format!("echo:t{i}")))
        .collect();
    assert_eq!(tool_results(&transcript), expected);

    let TurnOutcome::Completed { steps, .. } = outcome else {
        panic!("expected completed turn");
    };
    assert_eq!(steps.len(), count);
    assert!(steps.iter().all(|step| step.status == ToolStatus::Success));

    let recorded = provider.requests().await;
    assert_eq!(recorded.len(), 2);
    // system, user, assistant with tool calls, then one result per request
    assert_eq!(recorded[1].messages.len(), 3 + count);
    assert_eq!(
        recorded[1].messages[2],
        ChatMessage::Assistant {
            content: String::new(),
            tool_calls: requests,
        }
    );
}

#[tokio::test]
async fn sequential_dispatch_keeps_request_order() {
    assert_results_in_request_order(false, 1).await;
    assert_results_in_request_order(false, 4).await;
}

#[tokio::test]
async fn parallel_dispatch_keeps_request_order() {
    assert_results_in_request_order(true, 1).await;
    assert_results_in_request_order(true, 4).await;
}

#[tokio::test]
async fn tool_failure_is_reported_and_turn_continues() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![ToolCallRequest::new(
            "call_1",
            "file_read",
            json!({"file_path": "/nope.txt"}),
        )]),
        text(&["That file does not exist."]),
    ]);
    let agent = agent(&provider, AgentOptions::new("gpt-test"));
    let mut transcript = transcript("read /nope.txt");

    let outcome = agent
        .run_turn(&mut transcript, &mut BufferSink::new())
        .await
        .unwrap();

    let TurnOutcome::Completed { response, steps } = outcome else {
        panic!("expected completed turn");
    };
    assert_eq!(response, "That file does not exist.");
    assert_eq!(steps[0].status, ToolStatus::Error);
    assert!(steps[0].content.starts_with(TOOL_ERROR_PREFIX));
    assert!(steps[0].content.contains("/nope.txt"));

    let recorded = provider.requests().await;
    let ChatMessage::Tool(result) = &recorded[1].messages[3] else {
        panic!("expected tool result before the second round-trip");
    };
    assert_eq!(result.status, ToolStatus::Error);
}

#[tokio::test]
async fn unknown_tool_does_not_abort_turn() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![ToolCallRequest::new("call_1", "git_rebase", json!({}))]),
        text(&["I cannot rebase."]),
    ]);
    let agent = agent(&provider, AgentOptions::new("gpt-test"));
    let mut transcript = transcript("rebase");

    let outcome = agent
        .run_turn(&mut transcript, &mut BufferSink::new())
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed { .. }));
    let results = tool_results(&transcript);
    assert!(results[0].1.contains("unknown tool requested: git_rebase"));
}

#[tokio::test]
async fn terminate_tool_ends_turn_without_further_round_trip() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![
            echo_call("call_1", "first", 0),
            ToolCallRequest::new("call_2", "quit_conversation", json!({})),
            echo_call("call_3", "never", 0),
        ]),
        text(&["unreachable"]),
    ]);
    let agent = agent(&provider, AgentOptions::new("gpt-test"));
    let mut transcript = transcript("bye");

    let outcome = agent
        .run_turn(&mut transcript, &mut BufferSink::new())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Terminated {
            message: QUIT_MESSAGE.into(),
        }
    );
    assert_eq!(provider.requests().await.len(), 1);
    assert_eq!(
        tool_results(&transcript),
        vec![("call_1".to_string(), "echo:first".to_string())]
    );
    assert_eq!(transcript.len(), 4);
}

#[tokio::test]
async fn parallel_batch_stops_at_terminate_tool() {
    let touched = Arc::new(AtomicUsize::new(0));
    let mut registry = registry();
    registry
        .register(ToolDescriptor::new(
            "touch",
            "Record that it ran.",
            ToolSchema::new(),
            Arc::new(Touch(Arc::clone(&touched))),
        ))
        .unwrap();
    let provider = ScriptedProvider::new(vec![
        calls(vec![
            echo_call("call_1", "first", 10),
            ToolCallRequest::new("call_2", "quit_conversation", json!({})),
            ToolCallRequest::new("call_3", "touch", json!({})),
        ]),
        text(&["unreachable"]),
    ]);
    let agent = Agent::new(
        Arc::new(provider.clone()),
        ToolGuard::new(Arc::new(registry)),
        AgentOptions::new("gpt-test").with_parallel_tools(true),
    );
    let mut transcript = transcript("bye");

    let outcome = agent
        .run_turn(&mut transcript, &mut BufferSink::new())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Terminated {
            message: QUIT_MESSAGE.into(),
        }
    );
    assert_eq!(touched.load(Ordering::SeqCst), 0);
    assert_eq!(provider.requests().await.len(), 1);
    assert_eq!(
        tool_results(&transcript),
        vec![("call_1".to_string(), "echo:first".to_string())]
    );
    assert_eq!(transcript.len(), 4);
}

#[tokio::test]
async fn parallel_batch_led_by_terminate_runs_nothing_else() {
    let touched = Arc::new(AtomicUsize::new(0));
    let mut registry = registry();
    registry
        .register(ToolDescriptor::new(
            "touch",
            "Record that it ran.",
            ToolSchema::new(),
            Arc::new(Touch(Arc::clone(&touched))),
        ))
        .unwrap();
    let provider = ScriptedProvider::new(vec![calls(vec![
        ToolCallRequest::new("call_1", "quit_conversation", json!({})),
        ToolCallRequest::new("call_2", "touch", json!({})),
    ])]);
    let agent = Agent::new(
        Arc::new(provider.clone()),
        ToolGuard::new(Arc::new(registry)),
        AgentOptions::new("gpt-test").with_parallel_tools(true),
    );
    let mut transcript = transcript("quit and touch");

    let outcome = agent
        .run_turn(&mut transcript, &mut BufferSink::new())
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Terminated { .. }));
    assert_eq!(touched.load(Ordering::SeqCst), 0);
    assert!(tool_results(&transcript).is_empty());
    assert_eq!(transcript.len(), 3);
}

#[tokio::test]
async fn model_failure_is_a_turn_error_and_keeps_transcript() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![echo_call("call_1", "a", 0)]),
        Round::Fail(ModelError::stream("scripted", "connection reset")),
    ]);
    let agent = agent(&provider, AgentOptions::new("gpt-test"));
    let mut transcript = transcript("echo");

    let error = agent
        .run_turn(&mut transcript, &mut BufferSink::new())
        .await
        .unwrap_err();

    assert!(matches!(error, AgentError::Model(ModelError::Stream { .. })));
    assert!(error.user_message().contains("connection reset"));
    assert_eq!(transcript.len(), 4);
    assert_eq!(tool_results(&transcript).len(), 1);
}

#[tokio::test]
async fn broken_stream_discards_partial_reply() {
    let provider = ScriptedProvider::new(vec![Round::Events(vec![
        Ok(ModelEvent::Content("Half an ans".into())),
        Err(ModelError::invalid_response("scripted", "unparseable chunk")),
    ])]);
    let agent = agent(&provider, AgentOptions::new("gpt-test"));
    let mut transcript = transcript("hello");
    let mut sink = BufferSink::new();

    let error = agent.run_turn(&mut transcript, &mut sink).await.unwrap_err();

    assert!(matches!(error, AgentError::Model(ModelError::InvalidResponse { .. })));
    assert_eq!(sink.text(), "Half an ans");
    assert_eq!(transcript.len(), 2);
}

#[tokio::test]
async fn step_limit_is_enforced() {
    let provider = ScriptedProvider::new(vec![
        calls(vec![echo_call("call_1", "a", 0)]),
        calls(vec![echo_call("call_2", "b", 0)]),
        calls(vec![echo_call("call_3", "c", 0)]),
    ]);
    let agent = agent(&provider, AgentOptions::new("gpt-test").with_max_steps(2));
    let mut transcript = transcript("loop forever");

    let error = agent
        .run_turn(&mut transcript, &mut BufferSink::new())
        .await
        .unwrap_err();

    assert!(matches!(error, AgentError::StepLimit(2)));
    assert_eq!(provider.requests().await.len(), 2);
    assert_eq!(tool_results(&transcript).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn stalled_model_times_out() {
    let provider = ScriptedProvider::new(vec![Round::Stall]);
    let agent = agent(
        &provider,
        AgentOptions::new("gpt-test").with_model_timeout(Some(Duration::from_secs(30))),
    );
    let mut transcript = transcript("hello");

    let error = agent
        .run_turn(&mut transcript, &mut BufferSink::new())
        .await
        .unwrap_err();

    assert!(matches!(error, AgentError::Timeout(limit) if limit == Duration::from_secs(30)));
    assert_eq!(transcript.len(), 2);
}
