use std::io;
use std::time::Duration;

use crate::infrastructure::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("agent exceeded the maximum of {0} model round-trips in one turn")]
    StepLimit(usize),
    #[error("model did not respond within {0:?}")]
    Timeout(Duration),
    #[error("failed to write model output: {0}")]
    Output(#[from] io::Error),
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Model(err) => err.user_message(),
            AgentError::StepLimit(limit) => format!(
                "The agent used all {limit} steps without finishing. Try a more specific request."
            ),
            AgentError::Timeout(after) => {
                format!("The model did not respond within {} seconds.", after.as_secs())
            }
            AgentError::Output(err) => format!("Could not write output: {err}"),
        }
    }
}
