//! Pipeline orchestrator
//!
//! Drives the five stages strictly in order. Before each call the stage is
//! marked working; after it the stage is completed (and its output forwarded)
//! or errored (and the run stops). Every change goes through the store as a
//! `WorkflowEvent`.

use crate::agent::{AgentInvoker, InvokeError};
use crate::config::{PipelineLimits, StageModels};
use crate::pipeline::error::PipelineError;
use crate::pipeline::events::{RunId, WorkflowEvent};
use crate::pipeline::fence::strip_document_fence;
use crate::pipeline::prompts::OutputLanguage;
use crate::pipeline::stage::StageKind;
use crate::pipeline::stages::{pipeline_stages, StageDescriptor, StageInputs};
use crate::state::WorkflowStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Sequential driver of the five-stage pipeline
#[derive(Clone)]
pub struct Orchestrator {
    invoker: Arc<dyn AgentInvoker>,
    stages: Vec<StageDescriptor>,
    max_idea_length: usize,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.stages)
            .field("max_idea_length", &self.max_idea_length)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Orchestrator over the fixed stage list bound to `models`
    pub fn new(
        invoker: Arc<dyn AgentInvoker>,
        models: &StageModels,
        limits: &PipelineLimits,
    ) -> Self {
        Self {
            invoker,
            stages: pipeline_stages(models),
            max_idea_length: limits.max_idea_length,
        }
    }

    /// Stage descriptors, in execution order
    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// Check the idea before anything else happens
    ///
    /// # Errors
    /// * `PipelineError::EmptyInput` - idea is empty or whitespace
    /// * `PipelineError::InvalidInput` - idea is longer than the configured limit
    pub fn validate_idea(&self, idea: &str) -> Result<(), PipelineError> {
        let trimmed = idea.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        let length = trimmed.chars().count();
        if length > self.max_idea_length {
            return Err(PipelineError::InvalidInput(format!(
                "idea too long ({} > {} characters)",
                length, self.max_idea_length
            )));
        }
        Ok(())
    }

    /// Validate the idea and claim a fresh run in the store
    ///
    /// Split from [`Orchestrator::execute`] so HTTP handlers can reject bad
    /// input or a busy session before they start streaming.
    pub async fn begin(
        &self,
        store: &WorkflowStore,
        idea: &str,
        language: OutputLanguage,
    ) -> Result<RunId, PipelineError> {
        self.validate_idea(idea)?;
        store.start_run(language).await
    }

    /// Run the whole pipeline: validate, reset, execute
    ///
    /// # Returns
    /// * `Ok(String)` - the final document (Synthesis output, fence stripped)
    /// * `Err(PipelineError)` - input rejected, or the failing stage's error
    pub async fn run(
        &self,
        store: &WorkflowStore,
        idea: &str,
        language: OutputLanguage,
    ) -> Result<String, PipelineError> {
        let run_id = self.begin(store, idea, language).await?;
        self.execute(store, run_id, idea, language).await
    }

    /// Execute the five stages of an already started run
    pub async fn execute(
        &self,
        store: &WorkflowStore,
        run_id: RunId,
        idea: &str,
        language: OutputLanguage,
    ) -> Result<String, PipelineError> {
        let span = info_span!("workflow_run", run_id = %run_id, language = language.code());
        let result = self
            .execute_stages(store, run_id, idea.trim(), language)
            .instrument(span)
            .await;

        // Bookkeeping failures still have to release the run.
        if let Err(err @ (PipelineError::OutOfOrder(_) | PipelineError::Transition(_))) = &result {
            error!(run_id = %run_id, error = %err, "Workflow state rejected an event");
            let _ = store
                .apply(WorkflowEvent::RunFailed {
                    run_id,
                    stage: err.failed_stage(),
                    error: err.to_string(),
                })
                .await;
        }
        result
    }

    async fn execute_stages(
        &self,
        store: &WorkflowStore,
        run_id: RunId,
        idea: &str,
        language: OutputLanguage,
    ) -> Result<String, PipelineError> {
        let run_started = Instant::now();
        let mut outputs: Vec<String> = Vec::with_capacity(self.stages.len());

        for descriptor in &self.stages {
            let stage = descriptor.kind;
            emit(
                store,
                WorkflowEvent::StageStarted {
                    run_id,
                    stage,
                    log: descriptor.start_log().to_string(),
                },
            )
            .await?;
            info!(stage = %stage, model = %descriptor.model, "Stage started");

            let stage_started = Instant::now();
            let inputs = StageInputs {
                idea,
                language,
                prior_outputs: &outputs,
            };
            let result = descriptor.run(self.invoker.as_ref(), inputs).await;

            // A reset while the request was in flight discards its result.
            if !store.is_current(run_id).await {
                info!(stage = %stage, "Run abandoned while stage was in flight");
                return Err(PipelineError::Abandoned);
            }

            match result {
                Ok(raw) => {
                    let output = if stage == StageKind::Synthesis {
                        strip_document_fence(&raw)
                    } else {
                        raw
                    };
                    info!(
                        stage = %stage,
                        output_len = output.len(),
                        duration_ms = stage_started.elapsed().as_millis(),
                        "Stage completed"
                    );
                    emit(
                        store,
                        WorkflowEvent::StageCompleted {
                            run_id,
                            stage,
                            log: descriptor.done_log().to_string(),
                            output: output.clone(),
                        },
                    )
                    .await?;
                    outputs.push(output);
                }
                Err(source) => {
                    error!(
                        stage = %stage,
                        error = %source,
                        duration_ms = stage_started.elapsed().as_millis(),
                        "Stage failed"
                    );
                    let message = source.to_string();
                    emit(
                        store,
                        WorkflowEvent::StageFailed {
                            run_id,
                            stage,
                            log: failure_log(&source),
                            error: message.clone(),
                        },
                    )
                    .await?;
                    emit(
                        store,
                        WorkflowEvent::RunFailed {
                            run_id,
                            stage: Some(stage),
                            error: message,
                        },
                    )
                    .await?;
                    return Err(PipelineError::Stage { stage, source });
                }
            }
        }

        let document = outputs.pop().unwrap_or_default();
        emit(
            store,
            WorkflowEvent::RunCompleted {
                run_id,
                document: document.clone(),
            },
        )
        .await?;
        info!(
            document_len = document.len(),
            duration_ms = run_started.elapsed().as_millis(),
            "Workflow run completed"
        );
        Ok(document)
    }
}

/// Apply an event; a stale run means the caller was abandoned
async fn emit(store: &WorkflowStore, event: WorkflowEvent) -> Result<(), PipelineError> {
    if store.apply(event).await? {
        Ok(())
    } else {
        Err(PipelineError::Abandoned)
    }
}

fn failure_log(error: &InvokeError) -> String {
    match error {
        InvokeError::Connection(_) => "AI connection error occurred.".to_string(),
        InvokeError::Upstream { status, .. } => {
            format!("AI service returned an error (HTTP {}).", status)
        }
        InvokeError::InvalidRequest(reason) => format!("Request rejected: {}.", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::StageStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers each stage with "O<n>" and fails on demand
    struct StubInvoker {
        models: StageModels,
        fail_on: Option<StageKind>,
        calls: Mutex<Vec<StageKind>>,
    }

    impl StubInvoker {
        fn new(fail_on: Option<StageKind>) -> Self {
            Self {
                models: distinct_models(),
                fail_on,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn stage_for(&self, model: &str) -> StageKind {
            StageKind::ALL
                .into_iter()
                .find(|k| self.models.for_stage(*k) == model)
                .unwrap()
        }
    }

    #[async_trait]
    impl AgentInvoker for StubInvoker {
        async fn invoke(
            &self,
            model: &str,
            _system_instruction: &str,
            _user_message: &str,
        ) -> Result<String, InvokeError> {
            let stage = self.stage_for(model);
            self.calls.lock().unwrap().push(stage);
            if self.fail_on == Some(stage) {
                return Err(InvokeError::Upstream {
                    status: 502,
                    detail: None,
                });
            }
            if stage == StageKind::Synthesis {
                return Ok("```markdown\n# Final\n```".to_string());
            }
            Ok(format!("O{}", stage.step_number()))
        }
    }

    fn distinct_models() -> StageModels {
        StageModels {
            evaluation: "m-eval".to_string(),
            analysis: "m-analysis".to_string(),
            architecture: "m-arch".to_string(),
            strategy: "m-strategy".to_string(),
            synthesis: "m-synth".to_string(),
        }
    }

    fn orchestrator(invoker: Arc<StubInvoker>) -> Orchestrator {
        Orchestrator::new(invoker, &distinct_models(), &PipelineLimits::default())
    }

    #[tokio::test]
    async fn test_run_success_strips_fence_and_completes_all() {
        let invoker = Arc::new(StubInvoker::new(None));
        let store = WorkflowStore::new();
        let document = orchestrator(invoker.clone())
            .run(&store, "an idea", OutputLanguage::English)
            .await
            .unwrap();

        assert_eq!(document, "# Final");
        let run = store.snapshot().await;
        assert!(run
            .stages
            .iter()
            .all(|s| s.status == StageStatus::Completed));
        assert_eq!(run.final_document.as_deref(), Some("# Final"));
        assert_eq!(run.stage(StageKind::Analysis).output.as_deref(), Some("O2"));
        assert!(!run.running);
        assert_eq!(*invoker.calls.lock().unwrap(), StageKind::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_failure_stops_pipeline() {
        let invoker = Arc::new(StubInvoker::new(Some(StageKind::Analysis)));
        let store = WorkflowStore::new();
        let err = orchestrator(invoker.clone())
            .run(&store, "an idea", OutputLanguage::English)
            .await
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some(StageKind::Analysis));
        let run = store.snapshot().await;
        assert_eq!(run.stage(StageKind::Evaluation).status, StageStatus::Completed);
        assert_eq!(run.stage(StageKind::Analysis).status, StageStatus::Error);
        assert_eq!(
            run.stage(StageKind::Analysis).latest_log(),
            Some("AI service returned an error (HTTP 502).")
        );
        assert_eq!(run.stage(StageKind::Architecture).status, StageStatus::Idle);
        assert!(run.final_document.is_none());
        assert!(!run.running);
        assert_eq!(
            *invoker.calls.lock().unwrap(),
            vec![StageKind::Evaluation, StageKind::Analysis]
        );
    }

    #[tokio::test]
    async fn test_empty_idea_makes_no_calls() {
        let invoker = Arc::new(StubInvoker::new(None));
        let store = WorkflowStore::new();
        let before = store.snapshot().await.run_id;
        let err = orchestrator(invoker.clone())
            .run(&store, "   \n", OutputLanguage::English)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EmptyInput));
        assert!(invoker.calls.lock().unwrap().is_empty());
        assert_eq!(store.snapshot().await.run_id, before);
    }

    #[tokio::test]
    async fn test_overlong_idea_is_rejected() {
        let invoker = Arc::new(StubInvoker::new(None));
        let orchestrator = Orchestrator::new(
            invoker.clone(),
            &distinct_models(),
            &PipelineLimits { max_idea_length: 5 },
        );
        let err = orchestrator.validate_idea("123456").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert!(orchestrator.validate_idea("12345").is_ok());
    }

    #[tokio::test]
    async fn test_rerun_starts_from_clean_state() {
        let invoker = Arc::new(StubInvoker::new(None));
        let store = WorkflowStore::new();
        let orchestrator = orchestrator(invoker);
        orchestrator
            .run(&store, "first", OutputLanguage::English)
            .await
            .unwrap();
        let first = store.snapshot().await.run_id;
        orchestrator
            .run(&store, "second", OutputLanguage::Vietnamese)
            .await
            .unwrap();
        let run = store.snapshot().await;
        assert_ne!(run.run_id, first);
        assert_eq!(run.language, OutputLanguage::Vietnamese);
        // Each stage logged exactly one start and one completion.
        assert!(run.stages.iter().all(|s| s.logs.len() == 2));
    }
}
