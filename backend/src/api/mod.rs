//! API module
//!
//! Contains HTTP request handlers for the workflow endpoints

pub mod config;
pub mod streaming;
pub mod workflow;
