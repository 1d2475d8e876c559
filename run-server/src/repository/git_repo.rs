//! Git Repository Store
//!
//! Handles all database operations related to git repositories.

use async_trait::async_trait;
use run_core::domain::repo::GitRepo;
use sqlx::PgPool;

/// Store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A repository with the same remote and branch already exists
    #[error("git repo {0} already exists")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Anything that can hold data about source repositories
#[async_trait]
pub trait RepoStore: Send + Sync {
    /// Saves a new repository
    async fn create_git_repo(&self, repo: &GitRepo) -> Result<(), StoreError>;

    /// Finds a repository by remote and branch
    async fn get_git_repo(&self, remote: &str, branch: &str)
    -> Result<Option<GitRepo>, StoreError>;

    /// Lists every repository, newest first
    async fn list_git_repos(&self) -> Result<Vec<GitRepo>, StoreError>;
}

/// PostgreSQL-backed repository store
#[derive(Clone)]
pub struct PgRepoStore {
    pool: PgPool,
}

impl PgRepoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RepoStore for PgRepoStore {
    async fn create_git_repo(&self, repo: &GitRepo) -> Result<(), StoreError> {
        tracing::debug!("creating git repo for {}", repo.remote);

        sqlx::query(
            r#"
            INSERT INTO git_repos (remote, branch, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&repo.remote)
        .bind(&repo.branch)
        .bind(repo.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Duplicate(repo.key())
            }
            other => StoreError::Database(other),
        })?;

        Ok(())
    }

    async fn get_git_repo(
        &self,
        remote: &str,
        branch: &str,
    ) -> Result<Option<GitRepo>, StoreError> {
        let row = sqlx::query_as::<_, GitRepoRow>(
            r#"
            SELECT remote, branch, created_at
            FROM git_repos
            WHERE remote = $1 AND branch = $2
            "#,
        )
        .bind(remote)
        .bind(branch)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_git_repos(&self) -> Result<Vec<GitRepo>, StoreError> {
        let rows = sqlx::query_as::<_, GitRepoRow>(
            r#"
            SELECT remote, branch, created_at
            FROM git_repos
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct GitRepoRow {
    remote: String,
    branch: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<GitRepoRow> for GitRepo {
    fn from(row: GitRepoRow) -> Self {
        GitRepo {
            remote: row.remote,
            branch: row.branch,
            created_at: row.created_at,
        }
    }
}
