//! Workflow API handlers
//!
//! Contains HTTP request handlers for starting, observing and resetting the
//! five-stage pipeline run of this session.
//!
//! Starting a run returns an SSE (Server-Sent Events) stream of
//! `WorkflowEvent`s so the frontend can update each stage card as it goes.
//! The run itself executes on its own task: a client that disconnects does
//! not stop it, and the snapshot endpoint keeps reflecting its progress.

use crate::api::streaming::{sse_response, SSE_DONE_SIGNAL};
use crate::error::AppError;
use crate::pipeline::{
    OutputLanguage, PipelineError, PipelineStage, RunId, StageKind, StageStatus, WorkflowEvent,
};
use crate::state::{AppState, WorkflowRun};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

/// Request body for starting a run
#[derive(Deserialize, Debug)]
pub struct RunWorkflowRequest {
    /// The raw product idea
    pub idea: String,
    /// Language of the final document ("vi" or "en")
    #[serde(default)]
    pub language: OutputLanguage,
}

/// Optional request body for a reset
#[derive(Deserialize, Debug, Default)]
pub struct ResetWorkflowRequest {
    /// Language to preselect for the next run
    #[serde(default)]
    pub language: OutputLanguage,
}

/// Per-stage view for the presentation layer
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StageView {
    /// Stage identity
    pub kind: StageKind,
    /// 1-based position
    pub step: u32,
    /// Card title
    pub title: String,
    /// Card description
    pub description: String,
    /// Current status
    pub status: StageStatus,
    /// Most recent progress message
    pub latest_log: Option<String>,
    /// All progress messages
    pub logs: Vec<String>,
    /// Produced text, once completed
    pub output: Option<String>,
}

impl From<&PipelineStage> for StageView {
    fn from(stage: &PipelineStage) -> Self {
        Self {
            kind: stage.kind,
            step: stage.kind.step_number(),
            title: stage.title.clone(),
            description: stage.description.clone(),
            status: stage.status,
            latest_log: stage.latest_log().map(str::to_string),
            logs: stage.logs.clone(),
            output: stage.output.clone(),
        }
    }
}

/// Snapshot of the whole run
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    /// Run identifier
    pub run_id: RunId,
    /// Selected output language
    pub language: OutputLanguage,
    /// When the run was created
    pub started_at: DateTime<Utc>,
    /// Whether the pipeline is currently executing
    pub running: bool,
    /// The five stages, in order
    pub stages: Vec<StageView>,
    /// Final document, once Synthesis completed
    pub final_document: Option<String>,
}

impl From<&WorkflowRun> for WorkflowSnapshot {
    fn from(run: &WorkflowRun) -> Self {
        Self {
            run_id: run.run_id,
            language: run.language,
            started_at: run.started_at,
            running: run.running,
            stages: run.stages.iter().map(StageView::from).collect(),
            final_document: run.final_document.clone(),
        }
    }
}

/// GET /api/workflow - Current state of every stage and the final document
pub async fn get_workflow(State(state): State<Arc<AppState>>) -> Json<WorkflowSnapshot> {
    let run = state.store.snapshot().await;
    Json(WorkflowSnapshot::from(&run))
}

/// POST /api/workflow/run - Start a run and stream its events
///
/// # Flow
/// 1. Validate the idea (400 when empty or too long, or the body is malformed)
/// 2. Claim a fresh run (409 when one is already running)
/// 3. Execute the five stages on a background task
/// 4. Stream every event of this run via SSE, then `[DONE]`
///
/// # Returns
/// * `Ok(Response)` - SSE stream with workflow events
/// * `Err(AppError)` - If the run could not be started
pub async fn run_workflow(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RunWorkflowRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;

    // Subscribe first so the stream sees the run's very first event.
    let events = state.store.subscribe();
    let run_id = state
        .orchestrator
        .begin(&state.store, &request.idea, request.language)
        .await?;

    let orchestrator = state.orchestrator.clone();
    let store = state.store.clone();
    let idea = request.idea;
    let language = request.language;
    tokio::spawn(async move {
        match orchestrator.execute(&store, run_id, &idea, language).await {
            Ok(document) => {
                tracing::debug!(run_id = %run_id, document_len = document.len(), "Run task finished");
            }
            Err(PipelineError::Abandoned) => {
                tracing::info!(run_id = %run_id, "Run task abandoned");
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "Run task failed");
            }
        }
    });

    sse_response(run_events(events, run_id))
}

/// Serialized events of one run, ending with `[DONE]`
///
/// The stream ends after the run's terminal event, or after a reset that
/// replaced the run. Resets seen before the run's own `run_reset` predate it
/// and are skipped.
pub fn run_events(
    mut events: broadcast::Receiver<WorkflowEvent>,
    run_id: RunId,
) -> impl Stream<Item = Result<String, axum::Error>> + Send + 'static {
    use async_stream::stream;

    stream! {
        let mut started = false;
        loop {
            match events.recv().await {
                Ok(event) => {
                    let ours = event.run_id() == run_id;
                    let is_reset = matches!(event, WorkflowEvent::RunReset { .. });
                    if ours {
                        started = true;
                    }
                    let abandoned = !ours && is_reset && started;
                    if !ours && !abandoned {
                        continue;
                    }
                    let terminal = event.is_terminal() || abandoned;
                    match serde_json::to_string(&event) {
                        Ok(json) => yield Ok::<String, axum::Error>(json),
                        Err(e) => yield Err(axum::Error::new(e)),
                    }
                    if terminal {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(run_id = %run_id, skipped = skipped, "SSE subscriber lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        yield Ok::<String, axum::Error>(SSE_DONE_SIGNAL.to_string());
    }
}

/// POST /api/workflow/reset - Discard the current run and start clean
///
/// A run that is still in flight is abandoned: its pending result is thrown
/// away and no further stage is started.
pub async fn reset_workflow(
    State(state): State<Arc<AppState>>,
    request: Option<Json<ResetWorkflowRequest>>,
) -> Json<WorkflowSnapshot> {
    let language = request.map(|Json(r)| r.language).unwrap_or_default();
    state.store.reset(language).await;
    let run = state.store.snapshot().await;
    Json(WorkflowSnapshot::from(&run))
}

/// GET /api/workflow/document - The final document as markdown
///
/// # Returns
/// * `Ok(Response)` - `text/markdown` body, ready to copy
/// * `Err(AppError::DocumentNotReady)` - Synthesis has not completed
pub async fn get_document(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let run = state.store.snapshot().await;
    let document = run.final_document.ok_or(AppError::DocumentNotReady)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        document,
    )
        .into_response())
}
