//! Pure validator/normalizer for user-supplied options.
//!
//! Every function here is synchronous and side-effect free, unit tested
//! directly with no database, keeping validation logic separate from the
//! executor layer.

use std::time::Duration;

use crate::error::QueueError;
use crate::job::Interval;

/// Lower bound on `newJobCheckInterval`: below this the poll loop would
/// dominate the executor with no benefit.
const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(25);
/// Upper bound on `newJobCheckInterval`: beyond this a subscriber would be
/// indistinguishable from "never polls".
const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// User-facing, as-received publish options.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub start_in: Option<Interval>,
    pub expire_in: Option<Interval>,
    pub retry_limit: Option<u32>,
    pub singleton_key: Option<String>,
    pub singleton_seconds: Option<i64>,
    pub singleton_minutes: Option<i64>,
    pub singleton_hours: Option<i64>,
    pub singleton_days: Option<i64>,
    pub singleton_next_slot: bool,
}

/// Normalized publish options, ready to hand to
/// [`crate::executor::SqlExecutor::insert_job`].
#[derive(Debug, Clone)]
pub struct NormalizedPublishOptions {
    pub start_in: Interval,
    pub expire_in: Interval,
    pub retry_limit: u32,
    pub singleton_key: Option<String>,
    /// The first non-null of `singletonSeconds | singletonMinutes×60 |
    /// singletonHours×3600 | singletonDays×86400`.
    pub singleton_seconds: Option<i64>,
    pub singleton_next_slot: bool,
}

/// Derive `singletonSeconds` from whichever of the four unit fields was
/// set, preferring the most granular one supplied.
fn resolve_singleton_seconds(opts: &PublishOptions) -> Result<Option<i64>, QueueError> {
    let seconds = opts
        .singleton_seconds
        .or_else(|| opts.singleton_minutes.map(|m| m * 60))
        .or_else(|| opts.singleton_hours.map(|h| h * 3600))
        .or_else(|| opts.singleton_days.map(|d| d * 86_400));

    if let Some(s) = seconds {
        if s <= 0 {
            return Err(QueueError::InvalidArgument(
                "singleton interval must be a positive number of seconds".to_string(),
            ));
        }
    }
    if opts.singleton_key.is_some() && seconds.is_none() {
        return Err(QueueError::InvalidArgument(
            "singletonKey requires one of singletonSeconds/Minutes/Hours/Days".to_string(),
        ));
    }
    Ok(seconds)
}

/// Validate and normalize `publish` options.
pub fn normalize_publish_options(
    opts: PublishOptions,
) -> Result<NormalizedPublishOptions, QueueError> {
    if let Some(Interval::Seconds(s)) = &opts.start_in {
        if *s < 0 {
            return Err(QueueError::InvalidArgument(
                "startIn must be a non-negative number of seconds".to_string(),
            ));
        }
    }

    let singleton_seconds = resolve_singleton_seconds(&opts)?;

    Ok(NormalizedPublishOptions {
        start_in: opts.start_in.unwrap_or(Interval::Seconds(0)),
        expire_in: opts.expire_in.unwrap_or_default(),
        retry_limit: opts.retry_limit.unwrap_or(0),
        singleton_key: opts.singleton_key,
        singleton_seconds,
        singleton_next_slot: opts.singleton_next_slot,
    })
}

/// User-facing, as-received `subscribe` options.
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    pub team_size: Option<u32>,
    pub new_job_check_interval_ms: Option<u64>,
    pub new_job_check_interval_secs: Option<u64>,
}

/// Normalized subscribe options, ready to spawn a worker pool from.
#[derive(Debug, Clone)]
pub struct NormalizedSubscribeOptions {
    pub team_size: u32,
    pub new_job_check_interval: Duration,
}

/// `applyNewJobCheckInterval`: accepts either `newJobCheckInterval`
/// (milliseconds) or `newJobCheckIntervalSeconds` (seconds), enforces
/// allowed ranges, and writes back a canonical millisecond value.
pub fn apply_new_job_check_interval(opts: &SubscribeOptions) -> Result<Duration, QueueError> {
    let interval = match (opts.new_job_check_interval_ms, opts.new_job_check_interval_secs) {
        (Some(ms), _) => Duration::from_millis(ms),
        (None, Some(secs)) => Duration::from_secs(secs),
        (None, None) => Duration::from_secs(1),
    };

    if interval < MIN_CHECK_INTERVAL || interval > MAX_CHECK_INTERVAL {
        return Err(QueueError::InvalidArgument(format!(
            "newJobCheckInterval must be between {:?} and {:?}, got {:?}",
            MIN_CHECK_INTERVAL, MAX_CHECK_INTERVAL, interval
        )));
    }

    Ok(interval)
}

/// Validate and normalize `subscribe` options.
pub fn normalize_subscribe_options(
    opts: SubscribeOptions,
) -> Result<NormalizedSubscribeOptions, QueueError> {
    let team_size = opts.team_size.unwrap_or(1);
    if team_size < 1 {
        return Err(QueueError::InvalidArgument(
            "teamSize must be at least 1".to_string(),
        ));
    }

    let new_job_check_interval = apply_new_job_check_interval(&opts)?;

    Ok(NormalizedSubscribeOptions {
        team_size,
        new_job_check_interval,
    })
}
