//! Git repository domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Branch used when a request doesn't name one
pub const DEFAULT_BRANCH: &str = "master";

/// A git repository registered for polling
///
/// A repository is identified by its remote and branch together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepo {
    /// Remote URL (e.g. "https://github.com/run-ci/run-server.git")
    pub remote: String,

    /// Branch to track
    pub branch: String,

    /// When this repository was registered
    pub created_at: DateTime<Utc>,
}

impl GitRepo {
    /// Creates a repository record stamped with the current time
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
            created_at: Utc::now(),
        }
    }

    /// Unique key of this repository, `remote#branch`
    pub fn key(&self) -> String {
        format!("{}#{}", self.remote, self.branch)
    }
}
