//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain; `middleware`
//! holds the request pipeline every route goes through.

pub mod error;
pub mod health;
pub mod middleware;
pub mod repo;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::notify::Dispatcher;
use crate::repository::RepoStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RepoStore>,
    pub dispatcher: Dispatcher,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        // Health check
        .route("/", get(health::get_root))
        .route("/health", get(health::health_check))
        // Repository endpoints
        .route(
            "/repos/git",
            post(repo::create_git_repo).get(repo::get_git_repo),
        )
        .with_state(state);

    middleware::compose(routes, &middleware::REQUEST_PIPELINE).layer(TraceLayer::new_for_http())
}
