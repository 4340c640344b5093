//! Agent invocation module
//!
//! Wraps one HTTP request to the remote chat-completion endpoint. Every
//! pipeline stage reaches the upstream model through the `AgentInvoker` trait.

pub mod chat_types;
pub mod client;
pub mod error;

pub use client::{AgentInvoker, HttpAgentInvoker};
pub use error::InvokeError;
