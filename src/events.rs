//! Observability surface: `job`, `expired`, `error` events.
//!
//! Modeled as a typed [`Event`] broadcast over a [`tokio::sync::broadcast`]
//! channel so any number of subscribers can call
//! [`crate::manager::Manager::events`] independently.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::QueueError;
use crate::job::{Job, JobId};

/// Events emitted by a [`crate::manager::Manager`]: `job(job)` on
/// dispatch, `expired(count)` on a non-zero expiration sweep, and
/// `error(err)` on any asynchronous failure.
#[derive(Debug, Clone)]
pub enum Event {
    /// A job was dispatched to a subscriber callback.
    Job(Job),
    /// An expiration sweep reverted `count` active jobs back to `expired`.
    Expired { count: u64 },
    /// An asynchronous failure: a callback error, a monitor-sweep error,
    /// or a worker fetch error. Never raised to a caller directly; this
    /// is the caller's only way to observe it.
    Error(Arc<EventError>),
}

/// The error payload carried by [`Event::Error`]. Wrapped in `Arc` so the
/// event stays `Clone` without cloning the underlying error, and carries
/// enough context to say *where* the failure happened.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("worker for job {job_id} failed: {source}")]
    Callback {
        job_id: JobId,
        #[source]
        source: QueueError,
    },
    #[error("worker fetch failed: {source}")]
    Fetch {
        #[source]
        source: QueueError,
    },
    #[error("expiration sweep failed: {source}")]
    Monitor {
        #[source]
        source: QueueError,
    },
}

/// A thin wrapper around a [`broadcast::Sender`] used internally by the
/// [`crate::manager::Manager`] to publish events; subscribers get a
/// [`broadcast::Receiver`] from [`crate::manager::Manager::events`].
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. If nobody is listening, the event is silently
    /// dropped (a broadcast send with no receivers never blocks or errors
    /// the publisher).
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}
