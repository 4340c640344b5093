//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. The LLM endpoint and credential are part of this
//! value and are injected at startup, so tests can point the pipeline at a
//! mock server.

use crate::pipeline::StageKind;
use serde::Serialize;
use std::env;
use std::time::Duration;

/// Default chat-completion endpoint
pub const DEFAULT_LLM_API_URL: &str = "https://ai.megallm.io/v1/chat/completions";

/// Sampling temperature sent with every request
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Maximum output size requested from the model
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Maximum idea length in characters
pub const DEFAULT_MAX_IDEA_LENGTH: usize = 10_000;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream LLM configuration
    pub llm: LlmConfig,
    /// Pipeline limits
    pub pipeline: PipelineLimits,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Upstream chat-completion endpoint configuration
#[derive(Clone, Serialize)]
pub struct LlmConfig {
    /// Full URL of the chat-completion endpoint
    pub api_url: String,
    /// Bearer credential; never serialized
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Optional request timeout in seconds (none by default)
    pub timeout_secs: Option<u64>,
    /// Model identifier per stage
    pub models: StageModels,
}

// Hand-written so the credential never reaches the logs.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &format_args!("<{} chars>", self.api_key.len()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("models", &self.models)
            .finish()
    }
}

/// Model identifier bound to each pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageModels {
    /// Model for the Evaluation stage
    pub evaluation: String,
    /// Model for the Analysis stage
    pub analysis: String,
    /// Model for the Architecture stage
    pub architecture: String,
    /// Model for the Strategy stage
    pub strategy: String,
    /// Model for the Synthesis stage
    pub synthesis: String,
}

/// Input limits applied before a run starts
#[derive(Debug, Clone, Serialize)]
pub struct PipelineLimits {
    /// Maximum idea length in characters
    pub max_idea_length: usize,
}

impl Default for StageModels {
    fn default() -> Self {
        Self {
            evaluation: "deepseek-r1-distill-llama-70b".to_string(),
            analysis: "deepseek-r1-distill-llama-70b".to_string(),
            architecture: "llama3.3-70b-instruct".to_string(),
            strategy: "mistralai/mistral-nemotron".to_string(),
            synthesis: "deepseek-ai/deepseek-v3.1".to_string(),
        }
    }
}

impl StageModels {
    /// Model identifier configured for a stage
    pub fn for_stage(&self, kind: StageKind) -> &str {
        match kind {
            StageKind::Evaluation => &self.evaluation,
            StageKind::Analysis => &self.analysis,
            StageKind::Architecture => &self.architecture,
            StageKind::Strategy => &self.strategy,
            StageKind::Synthesis => &self.synthesis,
        }
    }

    /// Whether `model` is one of the configured identifiers
    pub fn contains(&self, model: &str) -> bool {
        StageKind::ALL
            .iter()
            .any(|kind| self.for_stage(*kind) == model)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_LLM_API_URL.to_string(),
            api_key: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: None,
            models: StageModels::default(),
        }
    }
}

impl LlmConfig {
    /// Request timeout, if one is configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            max_idea_length: DEFAULT_MAX_IDEA_LENGTH,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = StageModels::default();
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            llm: LlmConfig {
                api_url: env::var("LLM_API_URL")
                    .unwrap_or_else(|_| DEFAULT_LLM_API_URL.to_string()),
                api_key: env::var("LLM_API_KEY").unwrap_or_default(),
                temperature: DEFAULT_TEMPERATURE,
                max_tokens: DEFAULT_MAX_TOKENS,
                timeout_secs: env::var("LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .filter(|t| *t > 0),
                models: StageModels {
                    evaluation: model_from_env("LLM_MODEL_EVALUATION", defaults.evaluation),
                    analysis: model_from_env("LLM_MODEL_ANALYSIS", defaults.analysis),
                    architecture: model_from_env("LLM_MODEL_ARCHITECTURE", defaults.architecture),
                    strategy: model_from_env("LLM_MODEL_STRATEGY", defaults.strategy),
                    synthesis: model_from_env("LLM_MODEL_SYNTHESIS", defaults.synthesis),
                },
            },
            pipeline: PipelineLimits {
                max_idea_length: env::var("MAX_IDEA_LENGTH")
                    .ok()
                    .and_then(|n| n.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_MAX_IDEA_LENGTH),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn model_from_env(key: &str, default: String) -> String {
    match env::var(key) {
        Ok(model) if !model.trim().is_empty() => model.trim().to_string(),
        _ => default,
    }
}
