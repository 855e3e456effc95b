//! A single long-lived polling loop.
//!
//! State machine: `idle → fetching → { dispatching, idle }`; `stop` is
//! accepted from any state and is terminal. Implemented as one
//! `tokio::spawn`'d task per worker, sharing a cloned executor handle
//! rather than a reference.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Notify;

use crate::error::QueueResult;
use crate::events::EventError;
use crate::job::Job;

pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, QueueResult<Option<Job>>> + Send + Sync>;
pub type Responder = Arc<dyn Fn(Job) + Send + Sync>;
pub type ErrorSink = Arc<dyn Fn(EventError) + Send + Sync>;

/// A running worker. Dropping this handle does not stop the worker; call
/// [`Worker::stop`] explicitly, the way [`crate::manager::Manager::close`]
/// does for its whole registry.
pub struct Worker {
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: tokio::task::JoinHandle<()>,
}

impl Worker {
    /// Spawn a worker polling every `interval`, calling `fetcher` for the
    /// next job and `responder` to dispatch it. Errors from `fetcher` are
    /// routed to `error_sink` instead of stopping the loop.
    pub fn spawn(interval: Duration, fetcher: Fetcher, responder: Responder, error_sink: ErrorSink) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        let task_stop = stop_flag.clone();
        let task_wake = wake.clone();
        let task = tokio::spawn(async move {
            loop {
                if task_stop.load(Ordering::Acquire) {
                    break;
                }

                match fetcher().await {
                    Ok(Some(job)) => responder(job),
                    Ok(None) => {}
                    Err(source) => error_sink(EventError::Fetch { source }),
                }

                if task_stop.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = task_wake.notified() => {}
                }
            }
        });

        Self {
            stop_flag,
            wake,
            task,
        }
    }

    /// Prevent any further fetch and cancel an armed sleep. Idempotent.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[tokio::test]
    async fn dispatches_fetched_jobs_to_responder() {
        let dispatched: Arc<Mutex<Vec<Job>>> = Arc::new(Mutex::new(Vec::new()));
        let dispatched_for_responder = dispatched.clone();

        let job = Job {
            id: crate::job::JobId::new(uuid::Uuid::new_v4()),
            name: "test".to_string(),
            data: serde_json::json!({}),
            state: crate::job::JobState::Active,
            retry_limit: 0,
            retry_count: 0,
            start_after: 0,
            singleton_key: None,
            singleton_on: None,
            created_at: 0,
            started_at: None,
            completed_at: None,
        };

        let served = Arc::new(AtomicBool::new(false));
        let served_for_fetcher = served.clone();
        let job_for_fetcher = job.clone();

        let fetcher: Fetcher = Arc::new(move || {
            let already_served = served_for_fetcher.swap(true, Ordering::AcqRel);
            let job = job_for_fetcher.clone();
            Box::pin(async move {
                if already_served {
                    Ok(None)
                } else {
                    Ok(Some(job))
                }
            })
        });

        let responder: Responder = Arc::new(move |job| {
            dispatched_for_responder.lock().unwrap().push(job);
        });

        let error_sink: ErrorSink = Arc::new(|_| {});

        let worker = Worker::spawn(Duration::from_millis(10), fetcher, responder, error_sink);
        tokio::time::sleep(Duration::from_millis(50)).await;
        worker.stop();

        assert_eq!(dispatched.lock().unwrap().len(), 1);
        assert_eq!(dispatched.lock().unwrap()[0].id, job.id);
    }

    #[tokio::test]
    async fn fetch_errors_are_routed_to_error_sink_and_loop_continues() {
        let error_count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let error_count_for_sink = error_count.clone();

        let fetcher: Fetcher = Arc::new(|| {
            Box::pin(async {
                Err(crate::error::QueueError::InvalidArgument(
                    "boom".to_string(),
                ))
            })
        });
        let responder: Responder = Arc::new(|_| {});
        let error_sink: ErrorSink = Arc::new(move |_| {
            error_count_for_sink.fetch_add(1, Ordering::AcqRel);
        });

        let worker = Worker::spawn(Duration::from_millis(5), fetcher, responder, error_sink);
        tokio::time::sleep(Duration::from_millis(40)).await;
        worker.stop();

        assert!(error_count.load(Ordering::Acquire) > 1);
    }
}
