use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque, globally unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for JobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The job lifecycle state machine:
///
/// `created → active → {completed, cancelled, expired, retry}`;
/// `expired → active` on re-fetch; `retry → active`. Terminal states are
/// `completed` and `cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Active,
    Completed,
    Expired,
    Cancelled,
    Retry,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Expired => "expired",
            JobState::Cancelled => "cancelled",
            JobState::Retry => "retry",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(JobState::Created),
            "active" => Ok(JobState::Active),
            "completed" => Ok(JobState::Completed),
            "expired" => Ok(JobState::Expired),
            "cancelled" => Ok(JobState::Cancelled),
            "retry" => Ok(JobState::Retry),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

/// An interval accepted wherever `startAfter`/`expireIn` allow "a
/// non-negative number of seconds, or an interval string parseable by the
/// store". The core never interprets this itself; it is handed
/// unchanged to the [`crate::executor::SqlExecutor`], which is the only
/// component allowed to know the store's interval grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interval {
    Seconds(i64),
    Literal(String),
}

impl Interval {
    pub fn seconds(secs: i64) -> Self {
        Interval::Seconds(secs)
    }
}

impl Default for Interval {
    /// `expireIn` defaults to "15 minutes".
    fn default() -> Self {
        Interval::Literal("15 minutes".to_string())
    }
}

impl From<i64> for Interval {
    fn from(secs: i64) -> Self {
        Interval::Seconds(secs)
    }
}

impl From<&str> for Interval {
    fn from(s: &str) -> Self {
        Interval::Literal(s.to_string())
    }
}

/// The primary entity persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub data: serde_json::Value,
    pub state: JobState,
    pub retry_limit: u32,
    pub retry_count: u32,
    pub start_after: i64,
    pub singleton_key: Option<String>,
    pub singleton_on: Option<i64>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

/// Arguments passed to [`crate::executor::SqlExecutor::insert_job`],
/// mirroring the positional `[id, name, retryLimit, startIn, expireIn,
/// data, singletonKey, singletonSeconds, singletonOffset]` tuple.
#[derive(Debug, Clone)]
pub struct InsertArgs {
    pub id: JobId,
    pub name: String,
    pub retry_limit: u32,
    pub start_in: Interval,
    pub expire_in: Interval,
    pub data: serde_json::Value,
    pub singleton_key: Option<String>,
    pub singleton_seconds: Option<i64>,
    pub singleton_offset: i64,
}
