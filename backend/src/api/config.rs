//! Configuration API handler
//!
//! Exposes the non-secret part of the loaded configuration so the frontend
//! can show which model runs each stage.

use crate::config::{LlmConfig, PipelineLimits};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Response body of GET /api/config
#[derive(Serialize, Debug)]
pub struct ConfigResponse {
    /// Upstream endpoint settings (credential omitted)
    pub llm: LlmConfig,
    /// Input limits
    pub pipeline: PipelineLimits,
    /// Whether a credential is configured at all
    pub api_key_configured: bool,
}

/// GET /api/config - Current endpoint, models and limits
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        llm: state.config.llm.clone(),
        pipeline: state.config.pipeline.clone(),
        api_key_configured: !state.config.llm.api_key.is_empty(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ServerConfig};

    #[tokio::test]
    async fn test_config_never_exposes_key() {
        let config = Config {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
            },
            llm: LlmConfig {
                api_key: "sk-secret".to_string(),
                ..LlmConfig::default()
            },
            pipeline: PipelineLimits::default(),
        };
        let state = Arc::new(AppState::new(config));

        let Json(body) = get_config(State(state)).await;
        let value = serde_json::to_value(&body).unwrap();
        assert!(!value.to_string().contains("sk-secret"));
        assert!(value["llm"].get("api_key").is_none());
        assert_eq!(value["api_key_configured"], true);
        assert_eq!(value["llm"]["models"]["strategy"], "mistralai/mistral-nemotron");
        assert_eq!(value["pipeline"]["max_idea_length"], 10_000);
    }
}
