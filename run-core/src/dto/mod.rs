//! Data Transfer Objects for the HTTP API
//!
//! DTOs are the request and response shapes exchanged with clients. They
//! stay separate from the domain types so the wire format can evolve on its own.

pub mod repo;
