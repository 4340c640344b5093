//! Workflow state-transition events
//!
//! The orchestrator never mutates the run directly. It emits these events;
//! the store applies them and forwards them to subscribers (SSE, WebSocket).

use crate::pipeline::prompts::OutputLanguage;
use crate::pipeline::stage::StageKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one workflow run
pub type RunId = Uuid;

/// A discrete change to the workflow run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// The run was replaced by five fresh idle stages
    RunReset {
        /// New run identifier
        run_id: RunId,
        /// Output language chosen for the run
        language: OutputLanguage,
    },
    /// A stage moved to working
    StageStarted {
        /// Run the stage belongs to
        run_id: RunId,
        /// Stage identity
        stage: StageKind,
        /// Progress message
        log: String,
    },
    /// A stage finished successfully
    StageCompleted {
        /// Run the stage belongs to
        run_id: RunId,
        /// Stage identity
        stage: StageKind,
        /// Progress message
        log: String,
        /// Produced text
        output: String,
    },
    /// A stage failed; the run stops here
    StageFailed {
        /// Run the stage belongs to
        run_id: RunId,
        /// Stage identity
        stage: StageKind,
        /// Progress message
        log: String,
        /// Error description
        error: String,
    },
    /// All five stages completed
    RunCompleted {
        /// Run identifier
        run_id: RunId,
        /// Final document, fence stripped
        document: String,
    },
    /// The run stopped on an error
    RunFailed {
        /// Run identifier
        run_id: RunId,
        /// Stage that failed, if any
        stage: Option<StageKind>,
        /// Error description
        error: String,
    },
}

impl WorkflowEvent {
    /// Run this event belongs to
    pub fn run_id(&self) -> RunId {
        match self {
            WorkflowEvent::RunReset { run_id, .. }
            | WorkflowEvent::StageStarted { run_id, .. }
            | WorkflowEvent::StageCompleted { run_id, .. }
            | WorkflowEvent::StageFailed { run_id, .. }
            | WorkflowEvent::RunCompleted { run_id, .. }
            | WorkflowEvent::RunFailed { run_id, .. } => *run_id,
        }
    }

    /// Whether this event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowEvent::RunCompleted { .. } | WorkflowEvent::RunFailed { .. }
        )
    }
}
