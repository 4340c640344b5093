//! Idea-to-Prompt Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
/// Five-stage pipeline: stages, prompts, orchestration
pub mod pipeline;
/// Application state management
///
/// Holds the session's workflow run and the shared orchestrator.
pub mod state;
pub mod websocket;
