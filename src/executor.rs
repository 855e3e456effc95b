//! The storage contract the core drives instead of executing SQL itself.
//!
//! One method per named plan, each returning exactly what the Manager
//! needs (a row count for modifying plans, an optional row for selecting
//! plans) rather than a generic result set the Manager would have to
//! decode.

use async_trait::async_trait;

use crate::error::QueueResult;
use crate::job::{InsertArgs, Job, JobId};

/// Implemented by the storage backend. The core never executes SQL
/// directly; it only ever calls through this trait, so swapping SQLite for
/// Postgres/MySQL never touches `Manager`, `Worker`, `Plans`, or
/// `Attorney`.
#[async_trait]
pub trait SqlExecutor: Send + Sync + 'static {
    /// Atomically claim and return one eligible row for `name`, or `None`
    /// if none is eligible. "Eligible" is `state ∈ {created, retry,
    /// expired} ∧ startAfter ≤ now`.
    async fn fetch_next_job(&self, name: &str) -> QueueResult<Option<Job>>;

    /// Revert every `active` job whose visibility window elapsed back to
    /// `expired`. Returns the number of rows affected.
    async fn expire_jobs(&self) -> QueueResult<u64>;

    /// Insert a new job row, honoring singleton suppression. Returns
    /// `Some(id)` on success, `None` if a singleton row already occupies
    /// the target bucket.
    async fn insert_job(&self, args: InsertArgs) -> QueueResult<Option<JobId>>;

    /// Mark a job `completed`. Returns the number of rows affected (0 or
    /// 1); the Manager asserts this is exactly 1.
    async fn complete_job(&self, id: JobId) -> QueueResult<u64>;

    /// Mark a job `cancelled`. Returns the number of rows affected (0 or
    /// 1); the Manager asserts this is exactly 1.
    async fn cancel_job(&self, id: JobId) -> QueueResult<u64>;
}
