//! Git Repository API Handlers
//!
//! HTTP endpoints for registering and looking up git repositories.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use run_core::dto::repo::{CreateGitRepo, GitRepoQuery, GitRepoResponse};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::api::middleware::CorrelationId;
use crate::service::git_repo_service;

/// POST /repos/git
/// Register a git repository and notify the pollers
///
/// Answers 202 as soon as the repository is saved; the notification is
/// delivered in the background.
pub async fn create_git_repo(
    State(state): State<AppState>,
    request_id: CorrelationId,
    body: Result<Json<CreateGitRepo>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<GitRepoResponse>)> {
    let Json(req) = body.map_err(|rejection| {
        tracing::error!(error = %rejection, "unable to unmarshal request body");
        ApiError::BadRequest(rejection.body_text())
    })?;

    let repo = git_repo_service::create_git_repo(
        state.store.as_ref(),
        &state.dispatcher,
        request_id.as_str(),
        req,
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(repo.into())))
}

/// GET /repos/git
/// List every repository, or fetch one with `?remote=...&branch=...`
///
/// The branch defaults to `master` when only a remote is given.
pub async fn get_git_repo(
    State(state): State<AppState>,
    Query(query): Query<GitRepoQuery>,
) -> ApiResult<Response> {
    let Some(remote) = query.remote.as_deref() else {
        tracing::info!("missing 'remote' argument, fetching all repos");

        let repos = git_repo_service::list_git_repos(state.store.as_ref()).await?;
        let resp: Vec<GitRepoResponse> = repos.into_iter().map(Into::into).collect();

        return Ok(Json(resp).into_response());
    };

    let branch = query.branch_or_default();
    tracing::debug!("using {} as branch", branch);

    let repo = git_repo_service::get_git_repo(state.store.as_ref(), remote, branch).await?;

    Ok(Json(GitRepoResponse::from(repo)).into_response())
}
