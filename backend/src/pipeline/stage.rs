//! Pipeline stage model
//!
//! A stage is one of five fixed, totally ordered steps. Each carries a
//! status, a progress log and, once completed, the text it produced.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of a pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Critique and refine the raw idea
    Evaluation,
    /// Turn the refined concept into requirements
    Analysis,
    /// Choose a stack and design the data model
    Architecture,
    /// Plan structure, security and delivery phases
    Strategy,
    /// Combine everything into the final document
    Synthesis,
}

impl StageKind {
    /// All stages in execution order
    pub const ALL: [StageKind; 5] = [
        StageKind::Evaluation,
        StageKind::Analysis,
        StageKind::Architecture,
        StageKind::Strategy,
        StageKind::Synthesis,
    ];

    /// Zero-based position in the pipeline
    pub fn index(self) -> usize {
        self as usize
    }

    /// One-based step number, as shown to users
    pub fn step_number(self) -> u32 {
        self as u32 + 1
    }

    /// Stage that runs right before this one
    pub fn previous(self) -> Option<StageKind> {
        self.index()
            .checked_sub(1)
            .map(|i| StageKind::ALL[i])
    }

    /// Stable identifier used in logs and events
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Evaluation => "evaluation",
            StageKind::Analysis => "analysis",
            StageKind::Architecture => "architecture",
            StageKind::Strategy => "strategy",
            StageKind::Synthesis => "synthesis",
        }
    }

    /// Card title shown to users
    pub fn title(self) -> &'static str {
        match self {
            StageKind::Evaluation => "Visionary & Psychologist",
            StageKind::Analysis => "Lead Business Analyst",
            StageKind::Architecture => "System Architect",
            StageKind::Strategy => "Engineering Manager",
            StageKind::Synthesis => "Chief Product Officer",
        }
    }

    /// Card description shown to users
    pub fn description(self) -> &'static str {
        match self {
            StageKind::Evaluation => {
                "Simulates the user lifecycle to find breaking points and digs into user psychology to turn the raw idea into a complete product ecosystem."
            }
            StageKind::Analysis => {
                "Converts the concept into flow-based requirements, pinning down data flow and core business logic."
            }
            StageKind::Architecture => {
                "Designs the technology stack and database schema, and decides how services communicate."
            }
            StageKind::Strategy => {
                "Plans the implementation, assesses risks and sets the security standards."
            }
            StageKind::Synthesis => {
                "Combines every prior result into one academic-grade system prompt with the core algorithmic strategy."
            }
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a stage within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not started yet
    #[default]
    Idle,
    /// Request in flight
    Working,
    /// Finished with output
    Completed,
    /// Finished with a failure
    Error,
}

/// Rejected status transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Illegal transition for stage {stage}: {from:?} -> {to:?}")]
pub struct TransitionError {
    /// Stage the transition was attempted on
    pub stage: StageKind,
    /// Status before the attempt
    pub from: StageStatus,
    /// Requested status
    pub to: StageStatus,
}

/// One stage of a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStage {
    /// Stage identity
    pub kind: StageKind,
    /// Human-readable title
    pub title: String,
    /// Human-readable description
    pub description: String,
    /// Current status
    pub status: StageStatus,
    /// Progress messages, oldest first
    pub logs: Vec<String>,
    /// Produced text, present once completed
    pub output: Option<String>,
}

impl PipelineStage {
    /// Fresh idle stage
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            description: kind.description().to_string(),
            status: StageStatus::Idle,
            logs: Vec::new(),
            output: None,
        }
    }

    /// Most recent progress message
    pub fn latest_log(&self) -> Option<&str> {
        self.logs.last().map(String::as_str)
    }

    /// idle -> working
    pub fn begin(&mut self, log: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(StageStatus::Idle, StageStatus::Working)?;
        self.logs.push(log.into());
        Ok(())
    }

    /// working -> completed, attaching the output
    pub fn complete(
        &mut self,
        log: impl Into<String>,
        output: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.transition(StageStatus::Working, StageStatus::Completed)?;
        self.logs.push(log.into());
        self.output = Some(output.into());
        Ok(())
    }

    /// working -> error
    pub fn fail(&mut self, log: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(StageStatus::Working, StageStatus::Error)?;
        self.logs.push(log.into());
        Ok(())
    }

    fn transition(&mut self, from: StageStatus, to: StageStatus) -> Result<(), TransitionError> {
        if self.status != from {
            return Err(TransitionError {
                stage: self.kind,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(StageKind::Evaluation < StageKind::Analysis);
        assert!(StageKind::Strategy < StageKind::Synthesis);
        for (i, kind) in StageKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(kind.step_number() as usize, i + 1);
        }
        assert_eq!(StageKind::Evaluation.previous(), None);
        assert_eq!(
            StageKind::Synthesis.previous(),
            Some(StageKind::Strategy)
        );
    }

    #[test]
    fn test_new_stage_is_idle() {
        let stage = PipelineStage::new(StageKind::Analysis);
        assert_eq!(stage.status, StageStatus::Idle);
        assert!(stage.logs.is_empty());
        assert!(stage.output.is_none());
        assert_eq!(stage.title, "Lead Business Analyst");
        assert!(stage.latest_log().is_none());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut stage = PipelineStage::new(StageKind::Evaluation);
        stage.begin("starting").unwrap();
        assert_eq!(stage.status, StageStatus::Working);
        stage.complete("done", "output text").unwrap();
        assert_eq!(stage.status, StageStatus::Completed);
        assert_eq!(stage.output.as_deref(), Some("output text"));
        assert_eq!(stage.logs, vec!["starting", "done"]);
        assert_eq!(stage.latest_log(), Some("done"));
    }

    #[test]
    fn test_failure_transition() {
        let mut stage = PipelineStage::new(StageKind::Architecture);
        stage.begin("starting").unwrap();
        stage.fail("boom").unwrap();
        assert_eq!(stage.status, StageStatus::Error);
        assert!(stage.output.is_none());
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut stage = PipelineStage::new(StageKind::Strategy);
        stage.begin("a").unwrap();
        stage.complete("b", "out").unwrap();

        let err = stage.begin("again").unwrap_err();
        assert_eq!(err.from, StageStatus::Completed);
        assert_eq!(err.to, StageStatus::Working);
        assert!(stage.fail("late").is_err());
        assert_eq!(stage.logs.len(), 2);

        let mut failed = PipelineStage::new(StageKind::Strategy);
        failed.begin("a").unwrap();
        failed.fail("b").unwrap();
        assert!(failed.begin("c").is_err());
        assert!(failed.complete("c", "x").is_err());
    }

    #[test]
    fn test_cannot_complete_idle_stage() {
        let mut stage = PipelineStage::new(StageKind::Synthesis);
        assert!(stage.complete("done", "x").is_err());
        assert_eq!(stage.status, StageStatus::Idle);
        assert!(stage.output.is_none());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&StageKind::Architecture).unwrap(),
            "\"architecture\""
        );
        assert_eq!(
            serde_json::to_string(&StageStatus::Working).unwrap(),
            "\"working\""
        );
    }
}
