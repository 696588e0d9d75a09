//! SQLite job store implementation

use async_trait::async_trait;
use media_bot_domain::{JobStore, JobStoreError, ScheduledJob};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// SQLite-backed scheduler state
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Open the job store at `db_path`, creating the file and schema if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, JobStoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    JobStoreError::Database(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, JobStoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), JobStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_jobs (
                id TEXT PRIMARY KEY,
                interval_secs INTEGER NOT NULL,
                next_run_at TEXT NOT NULL,
                last_run_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }
}

fn format_time(value: OffsetDateTime) -> Result<String, JobStoreError> {
    value
        .format(&Rfc3339)
        .map_err(|e| JobStoreError::Serialization(e.to_string()))
}

fn parse_time(value: &str) -> Result<OffsetDateTime, JobStoreError> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| JobStoreError::Serialization(e.to_string()))
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn get_job(&self, id: &str) -> Result<Option<ScheduledJob>, JobStoreError> {
        let row: Option<(String, i64, String, Option<String>)> = sqlx::query_as(
            "SELECT id, interval_secs, next_run_at, last_run_at FROM scheduled_jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        match row {
            Some((id, interval_secs, next_run_at, last_run_at)) => {
                let interval_secs = u64::try_from(interval_secs).map_err(|_| {
                    JobStoreError::Serialization(format!(
                        "Negative interval for job {}: {}",
                        id, interval_secs
                    ))
                })?;

                Ok(Some(ScheduledJob {
                    id,
                    interval_secs,
                    next_run_at: parse_time(&next_run_at)?,
                    last_run_at: last_run_at.as_deref().map(parse_time).transpose()?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn save_job(&self, job: &ScheduledJob) -> Result<(), JobStoreError> {
        let interval_secs = i64::try_from(job.interval_secs)
            .map_err(|e| JobStoreError::Serialization(e.to_string()))?;
        let next_run_at = format_time(job.next_run_at)?;
        let last_run_at = job.last_run_at.map(format_time).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO scheduled_jobs (id, interval_secs, next_run_at, last_run_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                interval_secs = excluded.interval_secs,
                next_run_at = excluded.next_run_at,
                last_run_at = excluded.last_run_at
            "#,
        )
        .bind(&job.id)
        .bind(interval_secs)
        .bind(&next_run_at)
        .bind(&last_run_at)
        .execute(&self.pool)
        .await
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn remove_job(&self, id: &str) -> Result<(), JobStoreError> {
        sqlx::query("DELETE FROM scheduled_jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }
}
