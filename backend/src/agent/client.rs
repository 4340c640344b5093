//! Chat-completion client
//!
//! Direct HTTP client for the OpenAI-compatible chat-completion endpoint that
//! backs every pipeline stage. One call is one request; nothing is retried.

use crate::agent::chat_types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::agent::error::InvokeError;
use crate::config::LlmConfig;
use async_trait::async_trait;

/// Something that can answer a (model, system instruction, user message) triple
///
/// The pipeline only depends on this trait, so tests can substitute a stub
/// that records prompts instead of talking to the network.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Send one two-message conversation to `model` and return the reply text
    ///
    /// # Errors
    /// * `InvokeError::InvalidRequest` - an input is empty or the model is unknown
    /// * `InvokeError::Connection` - the request could not be completed
    /// * `InvokeError::Upstream` - the endpoint returned a non-success status
    async fn invoke(
        &self,
        model: &str,
        system_instruction: &str,
        user_message: &str,
    ) -> Result<String, InvokeError>;
}

/// `AgentInvoker` backed by a real HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpAgentInvoker {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpAgentInvoker {
    /// Create an invoker that shares `client` (connection pooling)
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    fn validate(
        &self,
        model: &str,
        system_instruction: &str,
        user_message: &str,
    ) -> Result<(), InvokeError> {
        if model.trim().is_empty() {
            return Err(InvokeError::InvalidRequest(
                "model cannot be empty".to_string(),
            ));
        }
        if !self.config.models.contains(model) {
            return Err(InvokeError::InvalidRequest(format!(
                "model '{}' is not configured for any stage",
                model
            )));
        }
        if system_instruction.trim().is_empty() {
            return Err(InvokeError::InvalidRequest(
                "system instruction cannot be empty".to_string(),
            ));
        }
        if user_message.trim().is_empty() {
            return Err(InvokeError::InvalidRequest(
                "user message cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AgentInvoker for HttpAgentInvoker {
    async fn invoke(
        &self,
        model: &str,
        system_instruction: &str,
        user_message: &str,
    ) -> Result<String, InvokeError> {
        self.validate(model, system_instruction, user_message)?;

        let request_body = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage::system(system_instruction),
                ChatMessage::user(user_message),
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            url = %self.config.api_url,
            model = %model,
            system_len = system_instruction.len(),
            prompt_len = user_message.len(),
            "Calling chat-completion endpoint"
        );

        let mut request = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body);
        if let Some(timeout) = self.config.timeout() {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(model = %model, error = %e, "Chat-completion request failed");
            InvokeError::Connection(format!("failed to send request: {}", e))
        })?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let detail = response
                .text()
                .await
                .ok()
                .map(|body| body.trim().to_string())
                .filter(|body| !body.is_empty());

            tracing::error!(
                status_code = status_code,
                model = %model,
                error_body = detail.as_deref().unwrap_or(""),
                "Chat-completion endpoint returned error status"
            );

            return Err(InvokeError::Upstream {
                status: status_code,
                detail,
            });
        }

        let response_body = response.text().await.map_err(|e| {
            InvokeError::Connection(format!("failed to read response body: {}", e))
        })?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_body)
            .map_err(|e| InvokeError::Connection(format!("failed to decode response: {}", e)))?;

        let text = parsed.into_first_text();
        tracing::debug!(
            model = %model,
            response_len = text.len(),
            "Received chat-completion reply"
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageModels;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const MODEL: &str = "deepseek-ai/deepseek-v3.1";

    fn invoker_for(url: String) -> HttpAgentInvoker {
        HttpAgentInvoker::new(
            reqwest::Client::new(),
            LlmConfig {
                api_url: url,
                api_key: "test-key".to_string(),
                models: StageModels::default(),
                ..LlmConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_invoke_success_sends_expected_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "model": MODEL,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ],
                "temperature": 0.7,
                "max_tokens": 8192
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#)
            .create_async()
            .await;

        let invoker = invoker_for(format!("{}/v1/chat/completions", server.url()));
        let result = invoker.invoke(MODEL, "be brief", "hello").await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "hi there");
    }

    #[tokio::test]
    async fn test_invoke_without_choices_returns_empty_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let invoker = invoker_for(server.url());
        let result = invoker.invoke(MODEL, "sys", "user").await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "");
    }

    #[tokio::test]
    async fn test_invoke_non_success_status_is_upstream_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let invoker = invoker_for(server.url());
        let err = invoker.invoke(MODEL, "sys", "user").await.unwrap_err();

        mock.assert_async().await;
        match err {
            InvokeError::Upstream { status, detail } => {
                assert_eq!(status, 429);
                assert!(detail.unwrap().contains("Rate limit"));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_invalid_json_is_connection_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body("This is not JSON")
            .create_async()
            .await;

        let invoker = invoker_for(server.url());
        let err = invoker.invoke(MODEL, "sys", "user").await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, InvokeError::Connection(_)));
        assert!(err.to_string().contains("decode"));
    }

    #[tokio::test]
    async fn test_invoke_unreachable_endpoint_is_connection_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let invoker = invoker_for("http://127.0.0.1:9/v1/chat/completions".to_string());
        let err = invoker.invoke(MODEL, "sys", "user").await.unwrap_err();
        assert!(matches!(err, InvokeError::Connection(_)));
    }

    #[tokio::test]
    async fn test_invoke_rejects_unknown_model_without_network() {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/").expect(0).create_async().await;

        let invoker = invoker_for(server.url());
        let err = invoker
            .invoke("not-a-configured-model", "sys", "user")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, InvokeError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_invoke_rejects_empty_inputs() {
        let invoker = invoker_for("http://127.0.0.1:9".to_string());
        for (model, sys, user) in [("", "s", "u"), (MODEL, " ", "u"), (MODEL, "s", "")] {
            let err = invoker.invoke(model, sys, user).await.unwrap_err();
            assert!(
                matches!(err, InvokeError::InvalidRequest(_)),
                "expected invalid request for ({:?}, {:?}, {:?})",
                model,
                sys,
                user
            );
        }
    }
}
