//! Repository Module
//!
//! Data access layer for the server.
//! The store is a trait so handlers can run against Postgres in production
//! and against memory in tests.

pub mod git_repo;
#[cfg(test)]
pub mod memory;

// Re-export for convenience
pub use git_repo::{PgRepoStore, RepoStore, StoreError};
