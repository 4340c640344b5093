// State management module
// Handles application state and the session's workflow store

pub mod app_state;
pub mod store;

pub use app_state::AppState;
pub use store::{WorkflowRun, WorkflowStore};
