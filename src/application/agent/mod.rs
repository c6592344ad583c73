//! # Agent Module
//!
//! Conversational agent that answers a user turn, calling tools as the model
//! requests them.
//!
//! ## Key Types
//!
//! - [`Agent`] - The turn executor
//! - [`AgentOptions`] - Step limit, dispatch mode and timeouts
//! - [`TurnOutcome`] - Result of a completed or terminated turn
//! - [`AgentError`] - Errors that abort a turn
//!
//! ## Agent Loop
//!
//! 1. Send the transcript and tool catalog to the model
//! 2. Stream the reply to the output sink
//! 3. If tools were requested, run each through the guard and loop
//! 4. Otherwise record the answer and finish the turn

mod errors;
mod models;
mod runner;

#[cfg(test)]
mod tests;

pub use errors::AgentError;
pub use models::{AgentOptions, AgentStep, TurnOutcome};
pub use runner::Agent;
