//! A concrete [`SqlExecutor`] over `sqlx::SqlitePool`, gated behind the
//! `sqlite` Cargo feature. The [`SqlExecutor`] trait stays generic so a
//! Postgres/MySQL executor could be added later from the same `Plans`
//! query-plan shape.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::error::{QueueError, QueueResult};
use crate::executor::SqlExecutor;
use crate::interval;
use crate::job::{InsertArgs, Job, JobId, JobState};
use crate::plans::Plans;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs() as i64
}

/// Persists jobs to a single SQLite database via `sqlx`. Tables are
/// prefixed with the configured schema name (`"{schema}_jobs"`); run
/// [`SqliteExecutor::migrate`] once per schema before use.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
    plans: Plans,
}

impl SqliteExecutor {
    /// Build an executor over an already-connected pool.
    pub fn new(pool: SqlitePool, schema: &str) -> Self {
        Self {
            pool,
            plans: Plans::new(schema),
        }
    }

    /// Connect to a database URL (e.g. `sqlite::memory:` or
    /// `sqlite://path/to/file.db`) and build an executor for `schema`.
    ///
    /// An in-memory URL is pinned to a single pooled connection: each
    /// connection sqlx opens for `:memory:` is its own private database, so
    /// a multi-connection pool would let different workers see different,
    /// unmigrated databases. File-backed URLs keep the default pool.
    pub async fn connect(db_url: &str, schema: &str) -> Result<Self, sqlx::Error> {
        let pool = if db_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect(db_url)
                .await?
        } else {
            SqlitePool::connect(db_url).await?
        };
        Ok(Self::new(pool, schema))
    }

    /// Provision the `"{schema}_jobs"` table and its singleton index.
    /// Idempotent; safe to call on every startup.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        let table = self.plans.table_name();
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                data TEXT NOT NULL,
                state TEXT NOT NULL,
                retry_limit INTEGER NOT NULL,
                retry_count INTEGER NOT NULL,
                start_after INTEGER NOT NULL,
                expire_in_seconds INTEGER NOT NULL,
                singleton_key TEXT,
                singleton_on INTEGER,
                created_at INTEGER NOT NULL,
                started_at INTEGER,
                completed_at INTEGER
            )"
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {table}_singleton
             ON {table} (name, singleton_key, singleton_on)
             WHERE singleton_key IS NOT NULL"
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_fetch
             ON {table} (name, state, start_after)"
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_job(row: sqlx::sqlite::SqliteRow) -> QueueResult<Job> {
    let id: String = row.try_get("id")?;
    let state: String = row.try_get("state")?;
    let data: String = row.try_get("data")?;

    Ok(Job {
        id: JobId::new(
            uuid::Uuid::parse_str(&id)
                .map_err(|e| QueueError::InvalidArgument(format!("corrupt job id {id}: {e}")))?,
        ),
        name: row.try_get("name")?,
        data: serde_json::from_str(&data)?,
        state: state
            .parse::<JobState>()
            .map_err(QueueError::InvalidArgument)?,
        retry_limit: row.try_get::<i64, _>("retry_limit")? as u32,
        retry_count: row.try_get::<i64, _>("retry_count")? as u32,
        start_after: row.try_get("start_after")?,
        singleton_key: row.try_get("singleton_key")?,
        singleton_on: row.try_get("singleton_on")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn fetch_next_job(&self, name: &str) -> QueueResult<Option<Job>> {
        let now = now_secs();
        let row = sqlx::query(&self.plans.fetch_next_job)
            .bind(now)
            .bind(name)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueueError::from)?;

        row.map(row_to_job).transpose()
    }

    async fn expire_jobs(&self) -> QueueResult<u64> {
        let now = now_secs();
        let result = sqlx::query(&self.plans.expire_job)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(QueueError::from)?;
        Ok(result.rows_affected())
    }

    async fn insert_job(&self, args: InsertArgs) -> QueueResult<Option<JobId>> {
        let created_at = now_secs();
        let start_after = created_at + interval::to_seconds(&args.start_in)?;
        let expire_in_seconds = interval::to_seconds(&args.expire_in)?;
        let data = serde_json::to_string(&args.data)?;
        let id = args.id.0.to_string();

        // Bucket boundary: floor((createdAt + singletonOffset) / singletonSeconds).
        // `singletonOffset` defaults to 0; `singletonNextSlot` sets it to
        // `singletonSeconds`, shifting a suppressed duplicate into the next
        // bucket (see the Open Question in DESIGN.md about why the
        // offset is additive-to-time rather than additive-to-bucket-index).
        let singleton_on = args
            .singleton_seconds
            .map(|window| (created_at + args.singleton_offset) / window);

        let row = sqlx::query(&self.plans.insert_job)
            .bind(&id)
            .bind(&args.name)
            .bind(&data)
            .bind(args.retry_limit as i64)
            .bind(start_after)
            .bind(expire_in_seconds)
            .bind(&args.singleton_key)
            .bind(singleton_on)
            .bind(created_at)
            .bind(&args.name)
            .bind(&args.singleton_key)
            .bind(singleton_on)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueueError::from)?;

        Ok(row.map(|_| args.id))
    }

    async fn complete_job(&self, id: JobId) -> QueueResult<u64> {
        let result = sqlx::query(&self.plans.complete_job)
            .bind(id.0.to_string())
            .bind(now_secs())
            .execute(&self.pool)
            .await
            .map_err(QueueError::from)?;
        Ok(result.rows_affected())
    }

    async fn cancel_job(&self, id: JobId) -> QueueResult<u64> {
        let result = sqlx::query(&self.plans.cancel_job)
            .bind(id.0.to_string())
            .bind(now_secs())
            .execute(&self.pool)
            .await
            .map_err(QueueError::from)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Interval;

    async fn setup() -> SqliteExecutor {
        let executor = SqliteExecutor::connect("sqlite::memory:", "pgq_test")
            .await
            .expect("failed to connect in-memory sqlite");
        executor.migrate().await.expect("failed to migrate");
        executor
    }

    fn insert_args(name: &str) -> InsertArgs {
        InsertArgs {
            id: JobId::new(uuid::Uuid::new_v4()),
            name: name.to_string(),
            retry_limit: 0,
            start_in: Interval::Seconds(0),
            expire_in: Interval::default(),
            data: serde_json::json!({"hello": "world"}),
            singleton_key: None,
            singleton_seconds: None,
            singleton_offset: 0,
        }
    }

    #[tokio::test]
    async fn insert_then_fetch_then_complete_roundtrip() {
        let executor = setup().await;
        let id = executor
            .insert_job(insert_args("email"))
            .await
            .unwrap()
            .expect("insert should succeed");

        let job = executor
            .fetch_next_job("email")
            .await
            .unwrap()
            .expect("job should be fetchable");
        assert_eq!(job.id, id);
        assert_eq!(job.state, JobState::Active);

        assert_eq!(executor.fetch_next_job("email").await.unwrap(), None);

        let affected = executor.complete_job(id).await.unwrap();
        assert_eq!(affected, 1);

        let affected_again = executor.complete_job(id).await.unwrap();
        assert_eq!(affected_again, 0);
    }

    #[tokio::test]
    async fn singleton_suppresses_duplicate_in_same_bucket() {
        let executor = setup().await;
        let mut first = insert_args("tick");
        first.singleton_key = Some("k".to_string());
        first.singleton_seconds = Some(60);

        let mut second = first.clone();
        second.id = JobId::new(uuid::Uuid::new_v4());

        let first_id = executor.insert_job(first).await.unwrap();
        assert!(first_id.is_some());

        let second_id = executor.insert_job(second).await.unwrap();
        assert_eq!(second_id, None);
    }
}
