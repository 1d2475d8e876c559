//! Run Core
//!
//! Core types shared by the run services.
//!
//! This crate contains:
//! - Domain types: Core business entities (GitRepo, Notification)
//! - DTOs: Request and response shapes for the HTTP API

pub mod domain;
pub mod dto;
