//! Invocation-specific error types
//!
//! Errors that can occur while calling the remote chat-completion endpoint.

use thiserror::Error;

/// Errors that can occur during a single agent invocation
#[derive(Error, Debug)]
pub enum InvokeError {
    /// The request could not be completed or its response could not be read
    #[error("Connection error: {0}")]
    Connection(String),

    /// The endpoint answered with a non-success HTTP status
    #[error("Upstream returned HTTP {status}{}", format_detail(.detail))]
    Upstream {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// Error body returned by the endpoint, if it could be read
        detail: Option<String>,
    },

    /// The request was rejected before reaching the network
    #[error("Invalid agent request: {0}")]
    InvalidRequest(String),
}

fn format_detail(detail: &Option<String>) -> String {
    match detail {
        Some(detail) if !detail.is_empty() => format!(": {}", detail),
        _ => String::new(),
    }
}
