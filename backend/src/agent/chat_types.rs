//! Chat-completion wire types
//!
//! Structs that mirror the OpenAI-compatible chat-completion JSON format.
//! Used to serialize requests and deserialize responses into typed Rust structs.

use serde::{Deserialize, Serialize};

/// Request body for the chat-completion endpoint
#[derive(Serialize, Debug)]
pub struct ChatCompletionRequest<'a> {
    /// Model identifier
    pub model: &'a str,
    /// Conversation sent to the model (system + user)
    pub messages: Vec<ChatMessage<'a>>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: u32,
}

/// A single message in the request conversation
#[derive(Serialize, Debug)]
pub struct ChatMessage<'a> {
    /// Role of the author ("system" or "user")
    pub role: &'static str,
    /// Message text
    pub content: &'a str,
}

impl<'a> ChatMessage<'a> {
    /// System-role message
    pub fn system(content: &'a str) -> Self {
        Self {
            role: "system",
            content,
        }
    }

    /// User-role message
    pub fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

/// Top-level chat-completion response
#[derive(Deserialize, Debug, Default)]
pub struct ChatCompletionResponse {
    /// Candidate replies; may be missing or empty
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// A single candidate reply
#[derive(Deserialize, Debug)]
pub struct Choice {
    /// The reply message, if present
    #[serde(default)]
    pub message: Option<ReplyMessage>,
}

/// Message content of a reply
#[derive(Deserialize, Debug)]
pub struct ReplyMessage {
    /// Reply text; `null` is treated as empty
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first reply, or empty text when there is none
    pub fn into_first_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_shape() {
        let request = ChatCompletionRequest {
            model: "m",
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: 8192,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], "sys");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 8192);
    }

    #[test]
    fn test_first_text_extraction() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"first"}},{"message":{"content":"second"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_first_text(), "first");
    }

    #[test]
    fn test_missing_reply_is_empty() {
        for body in [
            r#"{}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{}]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
        ] {
            let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
            assert_eq!(parsed.into_first_text(), "", "body: {}", body);
        }
    }
}
