//! Service Module
//!
//! Business logic layer for the server.
//! Services orchestrate between the store and the notification dispatcher.

pub mod git_repo;

// Re-export for convenience
pub use git_repo as git_repo_service;
