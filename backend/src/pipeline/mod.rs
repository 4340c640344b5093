//! Pipeline module
//!
//! The five-stage idea-to-prompt pipeline: stage model, prompts, stage
//! functions, the orchestrator that threads outputs from one stage into the
//! next, and the events it emits along the way.

pub mod error;
pub mod events;
pub mod fence;
pub mod orchestrator;
pub mod prompts;
pub mod stage;
pub mod stages;

pub use error::PipelineError;
pub use events::{RunId, WorkflowEvent};
pub use fence::strip_document_fence;
pub use orchestrator::Orchestrator;
pub use prompts::OutputLanguage;
pub use stage::{PipelineStage, StageKind, StageStatus, TransitionError};
pub use stages::{pipeline_stages, StageDescriptor, StageInputs};
