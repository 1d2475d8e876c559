//! Git repository DTOs

use serde::{Deserialize, Serialize};

use crate::domain::repo::{DEFAULT_BRANCH, GitRepo};

/// Request to register a git repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateGitRepo {
    pub remote: String,

    /// Branch to track, defaults to `master` when missing or empty
    #[serde(default)]
    pub branch: Option<String>,
}

impl CreateGitRepo {
    /// Branch named by the request, or the default one
    pub fn branch_or_default(&self) -> &str {
        match self.branch.as_deref() {
            Some(branch) if !branch.trim().is_empty() => branch,
            _ => DEFAULT_BRANCH,
        }
    }
}

/// Query parameters for looking repositories up
///
/// Without a remote every repository is listed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitRepoQuery {
    pub remote: Option<String>,
    pub branch: Option<String>,
}

impl GitRepoQuery {
    /// Branch named by the query, or the default one
    pub fn branch_or_default(&self) -> &str {
        match self.branch.as_deref() {
            Some(branch) if !branch.trim().is_empty() => branch,
            _ => DEFAULT_BRANCH,
        }
    }
}

/// Git repository as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepoResponse {
    pub remote: String,
    pub branch: String,
}

impl From<GitRepo> for GitRepoResponse {
    fn from(repo: GitRepo) -> Self {
        GitRepoResponse {
            remote: repo.remote,
            branch: repo.branch,
        }
    }
}
