//! Interactive console session: prompt loop, slash commands and turn output.

use std::io;

use serde_json::to_string_pretty;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

use crate::application::agent::{Agent, AgentStep, TurnOutcome};
use crate::application::streaming::ConsoleSink;
use crate::constants::PROMPT;
use crate::model::ModelProvider;
use crate::types::Transcript;

const PREVIEW_LIMIT: usize = 160;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] io::Error),
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The agent ran the terminate tool.
    Terminated(String),
    /// The user typed an exit command.
    UserExit,
    /// Input reached end of file.
    InputClosed,
}

enum LoopControl {
    Continue,
    Exit,
}

/// Owns the transcript for the lifetime of one conversation.
pub struct Session<P: ModelProvider> {
    agent: Agent<P>,
    transcript: Transcript,
    last_steps: Vec<AgentStep>,
}

impl<P: ModelProvider> Session<P> {
    pub fn new(agent: Agent<P>, system_prompt: impl Into<String>) -> Self {
        Self {
            agent,
            transcript: Transcript::new(system_prompt),
            last_steps: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub async fn run<R, W>(&mut self, input: R, output: W) -> Result<SessionEnd, SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send,
    {
        let mut console = ConsoleSink::new(output);
        let mut lines = input.lines();

        print_banner(console.get_mut()).await?;

        loop {
            prompt(console.get_mut()).await?;

            let Some(line) = lines.next_line().await? else {
                write_line(console.get_mut(), "").await?;
                console.get_mut().flush().await?;
                info!("Input closed, ending session");
                return Ok(SessionEnd::InputClosed);
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if is_command(input) {
                let control = self.handle_command(input, console.get_mut()).await?;
                console.get_mut().flush().await?;
                match control {
                    LoopControl::Continue => continue,
                    LoopControl::Exit => return Ok(SessionEnd::UserExit),
                }
            }

            write_line(console.get_mut(), "").await?;
            self.transcript.push_user(input);
            match self.agent.run_turn(&mut self.transcript, &mut console).await {
                Ok(TurnOutcome::Completed { steps, .. }) => {
                    write_line(console.get_mut(), "").await?;
                    self.last_steps = steps;
                }
                Ok(TurnOutcome::Terminated { message }) => {
                    let out = console.get_mut();
                    write_line(out, "").await?;
                    write_line(out, &message).await?;
                    out.flush().await?;
                    info!("Session terminated by agent");
                    return Ok(SessionEnd::Terminated(message));
                }
                Err(err) => {
                    error!(%err, "Turn failed");
                    let out = console.get_mut();
                    write_line(out, "").await?;
                    write_line(out, &format!("Error: {}", err.user_message())).await?;
                    self.last_steps.clear();
                }
            }
        }
    }

    async fn handle_command<W>(&mut self, input: &str, out: &mut W) -> io::Result<LoopControl>
    where
        W: AsyncWrite + Unpin,
    {
        let name = input.trim_start_matches('/').to_ascii_lowercase();
        debug!(command = %name, "Processing session command");

        match name.as_str() {
            "exit" | "quit" => {
                write_line(out, "Goodbye.").await?;
                Ok(LoopControl::Exit)
            }
            "help" | "?" => {
                print_help(out).await?;
                Ok(LoopControl::Continue)
            }
            "tools" => {
                write_line(out, "Available tools:").await?;
                for tool in self.agent.catalog() {
                    write_line(out, &format!("  {:<18} {}", tool.name, tool.description)).await?;
                }
                Ok(LoopControl::Continue)
            }
            "steps" => {
                if self.last_steps.is_empty() {
                    write_line(out, "No tools were run in the last turn.").await?;
                } else {
                    print_tool_steps(out, &self.last_steps).await?;
                }
                Ok(LoopControl::Continue)
            }
            "reset" => {
                let system_prompt = self.transcript.system_prompt().to_string();
                self.transcript = Transcript::new(system_prompt);
                self.last_steps.clear();
                write_line(out, "Conversation history cleared.").await?;
                Ok(LoopControl::Continue)
            }
            other => {
                write_line(
                    out,
                    &format!("Unknown command '/{other}'. Type /help for commands."),
                )
                .await?;
                Ok(LoopControl::Continue)
            }
        }
    }
}

fn is_command(input: &str) -> bool {
    input.starts_with('/') || matches!(input.to_ascii_lowercase().as_str(), "exit" | "quit")
}

async fn print_banner<W: AsyncWrite + Unpin>(out: &mut W) -> io::Result<()> {
    write_line(out, "Welcome to the Git Agent! Type your commands below.").await?;
    write_line(out, "Type 'exit' to quit or /help for commands.").await
}

async fn print_help<W: AsyncWrite + Unpin>(out: &mut W) -> io::Result<()> {
    write_line(out, "Available commands:").await?;
    write_line(out, "  /help     Show this help").await?;
    write_line(out, "  /tools    List the tools the agent can use").await?;
    write_line(out, "  /steps    Show tool calls from the last turn").await?;
    write_line(out, "  /reset    Start a new conversation").await?;
    write_line(out, "  /exit     Leave the session (also: exit, quit, /quit)").await
}

async fn print_tool_steps<W: AsyncWrite + Unpin>(out: &mut W, steps: &[AgentStep]) -> io::Result<()> {
    write_line(out, "Tool steps:").await?;
    for (index, step) in steps.iter().enumerate() {
        let status = if step.status.is_error() { "error" } else { "ok" };
        write_line(out, &format!("  {}. {} [{}]", index + 1, step.tool, status)).await?;

        let arguments =
            to_string_pretty(&step.arguments).unwrap_or_else(|_| step.arguments.to_string());
        for line in arguments.lines() {
            write_line(out, &format!("     in : {line}")).await?;
        }
        write_line(out, &format!("     out: {}", preview(&step.content))).await?;
    }
    Ok(())
}

async fn prompt<W: AsyncWrite + Unpin>(out: &mut W) -> io::Result<()> {
    out.write_all(format!("\n{PROMPT}").as_bytes()).await?;
    out.flush().await
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> io::Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await
}

fn preview(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= PREVIEW_LIMIT {
        return single_line;
    }
    let truncated: String = single_line.chars().take(PREVIEW_LIMIT).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words_and_slashes_are_commands() {
        assert!(is_command("exit"));
        assert!(is_command("QUIT"));
        assert!(is_command("/steps"));
        assert!(!is_command("exit the merge please"));
    }

    #[test]
    fn preview_truncates_long_output() {
        let long = "a".repeat(PREVIEW_LIMIT + 10);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), PREVIEW_LIMIT + 3);
        assert_eq!(preview("line one\nline two"), "line one line two");
    }
}
