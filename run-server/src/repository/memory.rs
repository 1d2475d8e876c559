//! In-memory repository store used by the tests

use async_trait::async_trait;
use run_core::domain::repo::GitRepo;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::repository::git_repo::{RepoStore, StoreError};

/// Store keeping repositories in a map keyed by `remote#branch`
#[derive(Clone, Default)]
pub struct InMemoryRepoStore {
    db: Arc<Mutex<HashMap<String, GitRepo>>>,
    fail_writes: bool,
}

impl InMemoryRepoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose writes always fail with a database error
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Inserts the repositories the tests look up
    pub fn seed_repos(&self) {
        let mut db = self.db.lock().unwrap();
        for repo in [
            GitRepo::new("test.git", "master"),
            GitRepo::new("test.git", "feature"),
            GitRepo::new("https://github.com/run-ci/run-server.git", "master"),
        ] {
            db.insert(repo.key(), repo);
        }
    }

    pub fn len(&self) -> usize {
        self.db.lock().unwrap().len()
    }

    pub fn contains(&self, remote: &str, branch: &str) -> bool {
        self.db
            .lock()
            .unwrap()
            .contains_key(&format!("{}#{}", remote, branch))
    }
}

#[async_trait]
impl RepoStore for InMemoryRepoStore {
    async fn create_git_repo(&self, repo: &GitRepo) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut db = self.db.lock().unwrap();
        let key = repo.key();
        if db.contains_key(&key) {
            return Err(StoreError::Duplicate(key));
        }

        db.insert(key, repo.clone());
        Ok(())
    }

    async fn get_git_repo(
        &self,
        remote: &str,
        branch: &str,
    ) -> Result<Option<GitRepo>, StoreError> {
        let db = self.db.lock().unwrap();
        Ok(db.get(&format!("{}#{}", remote, branch)).cloned())
    }

    async fn list_git_repos(&self) -> Result<Vec<GitRepo>, StoreError> {
        let db = self.db.lock().unwrap();
        let mut repos: Vec<GitRepo> = db.values().cloned().collect();
        repos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(repos)
    }
}
