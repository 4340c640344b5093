// Application state management
// Holds the configuration, the session's workflow store and the orchestrator

use crate::agent::{AgentInvoker, HttpAgentInvoker};
use crate::config::Config;
use crate::pipeline::Orchestrator;
use crate::state::store::WorkflowStore;
use std::sync::Arc;

/// Main application state
/// Shared by every handler; one workflow session per process
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Config,
    /// Workflow run of this session
    pub store: WorkflowStore,
    /// Pipeline driver
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Create state that talks to the configured chat-completion endpoint
    pub fn new(config: Config) -> Self {
        let invoker = HttpAgentInvoker::new(reqwest::Client::new(), config.llm.clone());
        Self::with_invoker(config, Arc::new(invoker))
    }

    /// Create state around a caller-provided invoker (stub endpoints in tests)
    pub fn with_invoker(config: Config, invoker: Arc<dyn AgentInvoker>) -> Self {
        let orchestrator = Orchestrator::new(invoker, &config.llm.models, &config.pipeline);
        Self {
            config,
            store: WorkflowStore::new(),
            orchestrator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, PipelineLimits, ServerConfig};
    use crate::pipeline::StageStatus;

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
            },
            llm: LlmConfig::default(),
            pipeline: PipelineLimits::default(),
        }
    }

    #[tokio::test]
    async fn test_app_state_creation() {
        let state = AppState::new(test_config());
        let run = state.store.snapshot().await;
        assert!(run.stages.iter().all(|s| s.status == StageStatus::Idle));
        assert_eq!(state.orchestrator.stages().len(), 5);
    }

    #[tokio::test]
    async fn test_clones_share_the_store() {
        let state = AppState::new(test_config());
        let other = state.clone();
        let run_id = state
            .store
            .reset(crate::pipeline::OutputLanguage::English)
            .await;
        assert!(other.store.is_current(run_id).await);
    }
}
