//! Workflow state store
//!
//! Holds the single workflow run of this session. The orchestrator feeds it
//! `WorkflowEvent`s; readers take snapshots or subscribe to the event stream.

use crate::pipeline::{
    OutputLanguage, PipelineError, PipelineStage, RunId, StageKind, StageStatus, WorkflowEvent,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One end-to-end execution of the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    /// Run identifier
    pub run_id: RunId,
    /// Output language selected for the run
    pub language: OutputLanguage,
    /// When the run was (re)created
    pub started_at: DateTime<Utc>,
    /// Exactly five stages, in order
    pub stages: Vec<PipelineStage>,
    /// Final document, present iff the Synthesis stage completed
    pub final_document: Option<String>,
    /// Whether an orchestrator is currently driving this run
    pub running: bool,
}

impl WorkflowRun {
    /// Five fresh idle stages and no document
    pub fn new(run_id: RunId, language: OutputLanguage) -> Self {
        Self {
            run_id,
            language,
            started_at: Utc::now(),
            stages: StageKind::ALL.iter().map(|k| PipelineStage::new(*k)).collect(),
            final_document: None,
            running: false,
        }
    }

    /// Stage by identity
    pub fn stage(&self, kind: StageKind) -> &PipelineStage {
        &self.stages[kind.index()]
    }

    fn stage_mut(&mut self, kind: StageKind) -> &mut PipelineStage {
        &mut self.stages[kind.index()]
    }

    /// Stage currently in flight, if any
    pub fn working_stage(&self) -> Option<StageKind> {
        self.stages
            .iter()
            .find(|s| s.status == StageStatus::Working)
            .map(|s| s.kind)
    }

    /// Apply one event belonging to this run
    fn apply(&mut self, event: &WorkflowEvent) -> Result<(), PipelineError> {
        match event {
            WorkflowEvent::RunReset { run_id, language } => {
                *self = WorkflowRun::new(*run_id, *language);
            }
            WorkflowEvent::StageStarted { stage, log, .. } => {
                if let Some(previous) = stage.previous() {
                    if self.stage(previous).status != StageStatus::Completed {
                        return Err(PipelineError::OutOfOrder(*stage));
                    }
                }
                if self.working_stage().is_some() {
                    return Err(PipelineError::OutOfOrder(*stage));
                }
                self.stage_mut(*stage).begin(log.clone())?;
            }
            WorkflowEvent::StageCompleted {
                stage, log, output, ..
            } => {
                self.stage_mut(*stage).complete(log.clone(), output.clone())?;
                if *stage == StageKind::Synthesis {
                    self.final_document = Some(output.clone());
                }
            }
            WorkflowEvent::StageFailed { stage, log, .. } => {
                self.stage_mut(*stage).fail(log.clone())?;
            }
            WorkflowEvent::RunCompleted { .. } | WorkflowEvent::RunFailed { .. } => {
                self.running = false;
            }
        }
        Ok(())
    }
}

/// Shared handle to the session's workflow run
///
/// Cloning is cheap; all clones see the same run and the same event stream.
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    run: Arc<RwLock<WorkflowRun>>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl Default for WorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowStore {
    /// Store holding an idle run
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            run: Arc::new(RwLock::new(WorkflowRun::new(
                Uuid::new_v4(),
                OutputLanguage::default(),
            ))),
            events,
        }
    }

    /// Copy of the current run
    pub async fn snapshot(&self) -> WorkflowRun {
        self.run.read().await.clone()
    }

    /// Receive every event applied from now on
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Copy of the current run plus a receiver for the events after it
    ///
    /// Events are published under the write lock, so nothing the snapshot
    /// already reflects is delivered again and nothing falls in between.
    pub async fn snapshot_and_subscribe(
        &self,
    ) -> (WorkflowRun, broadcast::Receiver<WorkflowEvent>) {
        let run = self.run.read().await;
        (run.clone(), self.events.subscribe())
    }

    /// Whether `run_id` is still the current run
    pub async fn is_current(&self, run_id: RunId) -> bool {
        self.run.read().await.run_id == run_id
    }

    /// Replace the run with five idle stages, abandoning any run in flight
    pub async fn reset(&self, language: OutputLanguage) -> RunId {
        let run_id = Uuid::new_v4();
        {
            let mut run = self.run.write().await;
            *run = WorkflowRun::new(run_id, language);
            self.publish(WorkflowEvent::RunReset { run_id, language });
        }
        tracing::info!(run_id = %run_id, language = language.code(), "Workflow reset");
        run_id
    }

    /// Reset and mark the new run as running, unless one is already running
    ///
    /// # Errors
    /// * `PipelineError::RunInProgress` - the current run has not finished
    pub async fn start_run(&self, language: OutputLanguage) -> Result<RunId, PipelineError> {
        let run_id = Uuid::new_v4();
        {
            let mut run = self.run.write().await;
            if run.running {
                return Err(PipelineError::RunInProgress);
            }
            *run = WorkflowRun::new(run_id, language);
            run.running = true;
            self.publish(WorkflowEvent::RunReset { run_id, language });
        }
        tracing::info!(run_id = %run_id, language = language.code(), "Workflow run started");
        Ok(run_id)
    }

    /// Apply an event and forward it to subscribers
    ///
    /// Returns `Ok(false)` without touching anything when the event belongs to
    /// a run that has since been reset.
    ///
    /// # Errors
    /// * `PipelineError::OutOfOrder` / `PipelineError::Transition` - the event
    ///   would break the stage ordering or status rules
    pub async fn apply(&self, event: WorkflowEvent) -> Result<bool, PipelineError> {
        let mut run = self.run.write().await;
        if run.run_id != event.run_id() {
            tracing::debug!(
                event_run = %event.run_id(),
                current_run = %run.run_id,
                "Ignoring event from abandoned run"
            );
            return Ok(false);
        }
        run.apply(&event)?;
        self.publish(event);
        Ok(true)
    }

    // Called with the write lock held.
    fn publish(&self, event: WorkflowEvent) {
        // No subscribers is fine; the snapshot still reflects the event.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(run_id: RunId, stage: StageKind) -> WorkflowEvent {
        WorkflowEvent::StageStarted {
            run_id,
            stage,
            log: format!("{} started", stage),
        }
    }

    fn completed(run_id: RunId, stage: StageKind, output: &str) -> WorkflowEvent {
        WorkflowEvent::StageCompleted {
            run_id,
            stage,
            log: format!("{} done", stage),
            output: output.to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_store_is_idle() {
        let store = WorkflowStore::new();
        let run = store.snapshot().await;
        assert_eq!(run.stages.len(), 5);
        assert!(run.stages.iter().all(|s| s.status == StageStatus::Idle));
        assert!(run.final_document.is_none());
        assert!(!run.running);
    }

    #[tokio::test]
    async fn test_apply_happy_path_sets_document_on_synthesis() {
        let store = WorkflowStore::new();
        let run_id = store.start_run(OutputLanguage::English).await.unwrap();

        for kind in StageKind::ALL {
            assert!(store.apply(started(run_id, kind)).await.unwrap());
            assert_eq!(store.snapshot().await.working_stage(), Some(kind));
            store
                .apply(completed(run_id, kind, kind.as_str()))
                .await
                .unwrap();
            let run = store.snapshot().await;
            assert_eq!(
                run.final_document.is_some(),
                kind == StageKind::Synthesis
            );
        }

        let run = store.snapshot().await;
        assert_eq!(run.final_document.as_deref(), Some("synthesis"));
        assert!(run.running);
        store
            .apply(WorkflowEvent::RunCompleted {
                run_id,
                document: "synthesis".to_string(),
            })
            .await
            .unwrap();
        assert!(!store.snapshot().await.running);
    }

    #[tokio::test]
    async fn test_stage_cannot_skip_ahead() {
        let store = WorkflowStore::new();
        let run_id = store.start_run(OutputLanguage::English).await.unwrap();

        let err = store
            .apply(started(run_id, StageKind::Analysis))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::OutOfOrder(StageKind::Analysis)));
        assert_eq!(
            store.snapshot().await.stage(StageKind::Analysis).status,
            StageStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_stage_cannot_restart_without_reset() {
        let store = WorkflowStore::new();
        let run_id = store.start_run(OutputLanguage::English).await.unwrap();
        store
            .apply(started(run_id, StageKind::Evaluation))
            .await
            .unwrap();
        store
            .apply(completed(run_id, StageKind::Evaluation, "x"))
            .await
            .unwrap();

        let err = store
            .apply(started(run_id, StageKind::Evaluation))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transition(_)));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = WorkflowStore::new();
        let run_id = store.start_run(OutputLanguage::English).await.unwrap();
        store
            .apply(started(run_id, StageKind::Evaluation))
            .await
            .unwrap();
        store
            .apply(completed(run_id, StageKind::Evaluation, "out"))
            .await
            .unwrap();

        let new_id = store.reset(OutputLanguage::Vietnamese).await;
        let run = store.snapshot().await;
        assert_ne!(new_id, run_id);
        assert_eq!(run.run_id, new_id);
        assert_eq!(run.language, OutputLanguage::Vietnamese);
        assert!(!run.running);
        assert!(run.final_document.is_none());
        for stage in &run.stages {
            assert_eq!(stage.status, StageStatus::Idle);
            assert!(stage.logs.is_empty());
            assert!(stage.output.is_none());
        }
    }

    #[tokio::test]
    async fn test_events_from_abandoned_run_are_ignored() {
        let store = WorkflowStore::new();
        let old_id = store.start_run(OutputLanguage::English).await.unwrap();
        store.reset(OutputLanguage::English).await;

        let applied = store
            .apply(started(old_id, StageKind::Evaluation))
            .await
            .unwrap();
        assert!(!applied);
        assert!(!store.is_current(old_id).await);
        assert_eq!(
            store.snapshot().await.stage(StageKind::Evaluation).status,
            StageStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_start_run_rejects_concurrent_run() {
        let store = WorkflowStore::new();
        store.start_run(OutputLanguage::English).await.unwrap();
        let err = store.start_run(OutputLanguage::English).await.unwrap_err();
        assert!(matches!(err, PipelineError::RunInProgress));

        // A reset abandons the run and frees the slot.
        store.reset(OutputLanguage::English).await;
        assert!(store.start_run(OutputLanguage::English).await.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_and_subscribe_do_not_overlap() {
        let store = WorkflowStore::new();
        let run_id = store.start_run(OutputLanguage::English).await.unwrap();
        store
            .apply(started(run_id, StageKind::Evaluation))
            .await
            .unwrap();

        let (run, mut rx) = store.snapshot_and_subscribe().await;
        assert_eq!(run.working_stage(), Some(StageKind::Evaluation));
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        store
            .apply(completed(run_id, StageKind::Evaluation, "out"))
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            completed(run_id, StageKind::Evaluation, "out")
        );
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_subscribers_receive_applied_events() {
        let store = WorkflowStore::new();
        let mut rx = store.subscribe();
        let run_id = store.start_run(OutputLanguage::English).await.unwrap();
        store
            .apply(started(run_id, StageKind::Evaluation))
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            WorkflowEvent::RunReset { .. }
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            started(run_id, StageKind::Evaluation)
        );
    }
}
