use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // A repository is identified by remote and branch together
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS git_repos (
            remote TEXT NOT NULL,
            branch VARCHAR(255) NOT NULL DEFAULT 'master',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (remote, branch)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_git_repos_created_at ON git_repos(created_at DESC)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
