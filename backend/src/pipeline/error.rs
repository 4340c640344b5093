//! Pipeline-specific error types
//!
//! Errors that can occur while starting or driving a workflow run.

use crate::agent::InvokeError;
use crate::pipeline::stage::{StageKind, TransitionError};
use thiserror::Error;

/// Errors that can occur during a workflow run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No idea text was supplied
    #[error("Idea text cannot be empty")]
    EmptyInput,

    /// Idea text was rejected (e.g. too long)
    #[error("Invalid idea: {0}")]
    InvalidInput(String),

    /// A stage's upstream call failed; the run stopped there
    #[error("Stage {stage} failed: {source}")]
    Stage {
        /// Stage that failed
        stage: StageKind,
        /// Underlying invocation error
        #[source]
        source: InvokeError,
    },

    /// Another run is still in progress
    #[error("A workflow run is already in progress")]
    RunInProgress,

    /// The run was discarded by a reset while it was in flight
    #[error("Workflow run was abandoned by a reset")]
    Abandoned,

    /// A stage was started before the one before it completed
    #[error("Stage {0} cannot start before the previous stage completes")]
    OutOfOrder(StageKind),

    /// A status transition was rejected
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl PipelineError {
    /// Stage that failed, for stage-level errors
    pub fn failed_stage(&self) -> Option<StageKind> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            PipelineError::Transition(err) => Some(err.stage),
            PipelineError::OutOfOrder(stage) => Some(*stage),
            _ => None,
        }
    }
}
