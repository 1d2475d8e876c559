//! Core domain types
//!
//! This module contains the core domain structures used by the run server.
//! Repositories are what gets persisted; notifications are what gets sent to
//! the pollers when a repository changes.

pub mod notification;
pub mod repo;
