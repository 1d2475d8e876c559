//! Git Repository Service
//!
//! Business logic for registering repositories and telling the pollers about them.

use run_core::domain::notification::Notification;
use run_core::domain::repo::GitRepo;
use run_core::dto::repo::CreateGitRepo;

use crate::notify::Dispatcher;
use crate::repository::{RepoStore, StoreError};

/// Service error type
#[derive(Debug)]
pub enum GitRepoError {
    NotFound(String),
    AlreadyExists(String),
    ValidationError(String),
    StoreError(StoreError),
}

impl From<StoreError> for GitRepoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(key) => GitRepoError::AlreadyExists(key),
            other => GitRepoError::StoreError(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, GitRepoError>;

/// Register a git repository
///
/// The repository is saved first. Only once the write succeeded is a
/// `create` notification handed to the dispatcher; delivery happens in the
/// background and never affects the result of this call.
pub async fn create_git_repo(
    store: &dyn RepoStore,
    dispatcher: &Dispatcher,
    request_id: &str,
    req: CreateGitRepo,
) -> Result<GitRepo> {
    validate_create_request(&req)?;

    let repo = GitRepo::new(req.remote.trim(), req.branch_or_default().trim());

    tracing::info!(remote = %repo.remote, branch = %repo.branch, "adding git repo");

    store.create_git_repo(&repo).await?;

    // Not being able to notify the pollers is not enough to fail the request.
    match Notification::created(&repo).to_bytes() {
        Ok(payload) => {
            dispatcher.dispatch(request_id, payload);
        }
        Err(e) => {
            tracing::warn!(error = %e, "unable to marshal poller create message");
        }
    }

    Ok(repo)
}

/// Get a repository by remote and branch
pub async fn get_git_repo(store: &dyn RepoStore, remote: &str, branch: &str) -> Result<GitRepo> {
    tracing::debug!(remote, branch, "getting repo");

    let repo = store
        .get_git_repo(remote, branch)
        .await?
        .ok_or_else(|| GitRepoError::NotFound(format!("{}#{}", remote, branch)))?;

    Ok(repo)
}

/// List all repositories
pub async fn list_git_repos(store: &dyn RepoStore) -> Result<Vec<GitRepo>> {
    let repos = store.list_git_repos().await?;
    Ok(repos)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_create_request(req: &CreateGitRepo) -> Result<()> {
    const MAX_REMOTE_LENGTH: usize = 2048;
    const MAX_BRANCH_LENGTH: usize = 255;

    if req.remote.trim().is_empty() {
        return Err(GitRepoError::ValidationError(
            "Remote cannot be empty".to_string(),
        ));
    }

    if req.remote.len() > MAX_REMOTE_LENGTH {
        return Err(GitRepoError::ValidationError(format!(
            "Remote is too long (max {} characters)",
            MAX_REMOTE_LENGTH
        )));
    }

    if req.branch_or_default().len() > MAX_BRANCH_LENGTH {
        return Err(GitRepoError::ValidationError(format!(
            "Branch is too long (max {} characters)",
            MAX_BRANCH_LENGTH
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{DispatcherConfig, notification_channel};
    use crate::repository::memory::InMemoryRepoStore;
    use run_core::domain::notification::Operation;

    #[test]
    fn test_validate_empty_remote() {
        let req = CreateGitRepo {
            remote: "   ".to_string(),
            branch: None,
        };

        let result = validate_create_request(&req);
        assert!(matches!(result, Err(GitRepoError::ValidationError(_))));
    }

    #[test]
    fn test_validate_branch_too_long() {
        let req = CreateGitRepo {
            remote: "test.git".to_string(),
            branch: Some("b".repeat(256)),
        };

        let result = validate_create_request(&req);
        assert!(matches!(result, Err(GitRepoError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_saves_and_notifies() {
        let store = InMemoryRepoStore::new();
        let (tx, mut rx) = notification_channel(1);
        let dispatcher = Dispatcher::new(tx, DispatcherConfig::default());

        let req = CreateGitRepo {
            remote: "test.git".to_string(),
            branch: None,
        };
        let repo = create_git_repo(&store, &dispatcher, "test", req).await.unwrap();

        assert_eq!(repo.branch, "master");
        assert!(store.contains("test.git", "master"));

        let payload = rx.recv().await.unwrap();
        let notification = Notification::from_bytes(&payload).unwrap();
        assert_eq!(notification.op(), Operation::Create);
        assert_eq!(notification.attribute("remote"), Some("test.git"));
        assert_eq!(notification.attribute("branch"), Some("master"));
    }

    #[tokio::test]
    async fn test_duplicate_is_reported_without_notification() {
        let store = InMemoryRepoStore::new();
        store.seed_repos();
        let (tx, mut rx) = notification_channel(1);
        let dispatcher = Dispatcher::new(tx, DispatcherConfig::default());

        let req = CreateGitRepo {
            remote: "test.git".to_string(),
            branch: Some("feature".to_string()),
        };
        let result = create_git_repo(&store, &dispatcher, "test", req).await;

        assert!(matches!(result, Err(GitRepoError::AlreadyExists(_))));
        drop(dispatcher);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_get_missing_repo() {
        let store = InMemoryRepoStore::new();

        let result = get_git_repo(&store, "nope.git", "master").await;
        assert!(matches!(result, Err(GitRepoError::NotFound(_))));
    }
}
