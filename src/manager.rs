//! Top-level coordinator: owns the executor handle, configuration,
//! worker registry, and the expiration monitor; exposes the public
//! publish/subscribe/fetch/complete/cancel surface.
//!
//! `Manager<E>` is `Clone` over `Arc`-shared state; every worker task and
//! the monitor task holds its own clone rather than a reference.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::{broadcast, Notify};

use crate::attorney::{self, PublishOptions, SubscribeOptions};
use crate::config::{Config, UuidVersion};
use crate::error::{QueueError, QueueResult};
use crate::events::{Event, EventBus, EventError};
use crate::executor::SqlExecutor;
use crate::id::{IdFactory, UuidV1Factory, UuidV4Factory};
use crate::job::{InsertArgs, Interval, Job, JobId};
use crate::worker::{ErrorSink, Fetcher, Responder, Worker};

/// A completion/cancellation capability handed to a subscriber callback in
/// place of a closure-captured id.
pub struct JobHandle<E: SqlExecutor> {
    id: JobId,
    manager: Manager<E>,
}

impl<E: SqlExecutor> JobHandle<E> {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub async fn complete(&self) -> QueueResult<JobId> {
        self.manager.complete(self.id).await
    }

    pub async fn cancel(&self) -> QueueResult<JobId> {
        self.manager.cancel(self.id).await
    }
}

/// The `{name, data, options}` single-argument form of `publish`.
pub struct PublishRequest {
    pub name: String,
    pub data: serde_json::Value,
    pub options: PublishOptions,
}

/// A subscriber callback: given a dispatched job and its completion handle,
/// returns whether it succeeded. Invoked after the responder defers one
/// scheduler tick, so a slow callback never blocks the worker's poll loop.
pub type Callback<E> =
    Arc<dyn Fn(Job, JobHandle<E>) -> BoxFuture<'static, QueueResult<()>> + Send + Sync>;

struct MonitorHandle {
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: tokio::task::JoinHandle<()>,
}

impl MonitorHandle {
    fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct Manager<E: SqlExecutor> {
    executor: Arc<E>,
    id_factory: Arc<dyn IdFactory>,
    config: Config,
    events: EventBus,
    workers: Arc<Mutex<Vec<Worker>>>,
    monitor: Arc<Mutex<Option<MonitorHandle>>>,
    stopped: Arc<AtomicBool>,
}

impl<E: SqlExecutor> Clone for Manager<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            id_factory: self.id_factory.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            workers: self.workers.clone(),
            monitor: self.monitor.clone(),
            stopped: self.stopped.clone(),
        }
    }
}

impl<E: SqlExecutor> Manager<E> {
    pub fn new(executor: E, config: Config) -> Self {
        let id_factory: Arc<dyn IdFactory> = match config.uuid_version {
            UuidVersion::V1 => Arc::new(UuidV1Factory),
            UuidVersion::V4 => Arc::new(UuidV4Factory),
        };

        Self {
            executor: Arc::new(executor),
            id_factory,
            config,
            events: EventBus::new(256),
            workers: Arc::new(Mutex::new(Vec::new())),
            monitor: Arc::new(Mutex::new(None)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to the `job`/`expired`/`error` event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// The `(name, data, options)` positional form.
    pub async fn publish(
        &self,
        name: &str,
        data: serde_json::Value,
        options: PublishOptions,
    ) -> QueueResult<Option<JobId>> {
        if name.is_empty() {
            return Err(QueueError::InvalidArgument(
                "name must not be empty".to_string(),
            ));
        }
        let normalized = attorney::normalize_publish_options(options)?;
        self.publish_inner(name, &data, normalized, 0).await
    }

    /// The `{name, data, options}` single-struct form.
    pub async fn publish_job(&self, request: PublishRequest) -> QueueResult<Option<JobId>> {
        self.publish(&request.name, request.data, request.options)
            .await
    }

    /// Insert one row, recursing at most once into the next singleton
    /// bucket when `singletonNextSlot` was requested and the current
    /// bucket is occupied.
    fn publish_inner<'a>(
        &'a self,
        name: &'a str,
        data: &'a serde_json::Value,
        options: attorney::NormalizedPublishOptions,
        singleton_offset: i64,
    ) -> BoxFuture<'a, QueueResult<Option<JobId>>> {
        Box::pin(async move {
            let id = self.id_factory.new_id();
            let args = InsertArgs {
                id,
                name: name.to_string(),
                retry_limit: options.retry_limit,
                start_in: options.start_in.clone(),
                expire_in: options.expire_in.clone(),
                data: data.clone(),
                singleton_key: options.singleton_key.clone(),
                singleton_seconds: options.singleton_seconds,
                singleton_offset,
            };

            match self.executor.insert_job(args).await? {
                Some(id) => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(job_id = %id, name, "published job");
                    Ok(Some(id))
                }
                None if options.singleton_next_slot => match options.singleton_seconds {
                    Some(seconds) => {
                        let retry = attorney::NormalizedPublishOptions {
                            start_in: Interval::Seconds(seconds),
                            singleton_next_slot: false,
                            ..options
                        };
                        self.publish_inner(name, data, retry, seconds).await
                    }
                    None => Ok(None),
                },
                None => Ok(None),
            }
        })
    }

    /// Claim and return one eligible row for `name`, or `None`.
    pub async fn fetch(&self, name: &str) -> QueueResult<Option<Job>> {
        self.executor.fetch_next_job(name).await
    }

    /// Mark `id` completed. Fails with [`QueueError::NotFound`] unless
    /// exactly one row was affected.
    pub async fn complete(&self, id: JobId) -> QueueResult<JobId> {
        let affected = self.executor.complete_job(id).await?;
        if affected != 1 {
            return Err(QueueError::NotFound { id });
        }
        #[cfg(feature = "tracing")]
        tracing::info!(job_id = %id, "completed job");
        Ok(id)
    }

    /// Mark `id` cancelled. Same row-count assertion as [`Manager::complete`].
    pub async fn cancel(&self, id: JobId) -> QueueResult<JobId> {
        let affected = self.executor.cancel_job(id).await?;
        if affected != 1 {
            return Err(QueueError::NotFound { id });
        }
        #[cfg(feature = "tracing")]
        tracing::info!(job_id = %id, "cancelled job");
        Ok(id)
    }

    /// `subscribe(name, cb)`, i.e. `subscribe_with_options` with defaults.
    pub fn subscribe(&self, name: impl Into<String>, callback: Callback<E>) -> QueueResult<()> {
        self.subscribe_with_options(name, SubscribeOptions::default(), callback)
    }

    /// Spawn `options.teamSize` workers polling `name`, each dispatching
    /// fetched jobs to `callback` after deferring one scheduler tick.
    pub fn subscribe_with_options(
        &self,
        name: impl Into<String>,
        options: SubscribeOptions,
        callback: Callback<E>,
    ) -> QueueResult<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(QueueError::InvalidArgument(
                "manager is stopped".to_string(),
            ));
        }

        let normalized = attorney::normalize_subscribe_options(options)?;
        let name: String = name.into();
        let mut workers = self.workers.lock().unwrap();

        for _ in 0..normalized.team_size {
            let fetch_name = name.clone();
            let manager_for_fetch = self.clone();
            let fetcher: Fetcher = Arc::new(move || {
                let manager = manager_for_fetch.clone();
                let name = fetch_name.clone();
                Box::pin(async move { manager.fetch(&name).await })
            });

            let manager_for_responder = self.clone();
            let callback_for_responder = callback.clone();
            let responder: Responder = Arc::new(move |job| {
                let manager = manager_for_responder.clone();
                let callback = callback_for_responder.clone();
                manager.events.publish(Event::Job(job.clone()));
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    let job_id = job.id;
                    let handle = JobHandle {
                        id: job_id,
                        manager: manager.clone(),
                    };
                    if let Err(source) = callback(job, handle).await {
                        #[cfg(feature = "tracing")]
                        tracing::error!(job_id = %job_id, %source, "subscriber callback failed");
                        manager
                            .events
                            .publish(Event::Error(Arc::new(EventError::Callback {
                                job_id,
                                source,
                            })));
                    }
                });
            });

            let manager_for_errors = self.clone();
            let error_sink: ErrorSink = Arc::new(move |err| {
                #[cfg(feature = "tracing")]
                tracing::error!(%err, "worker fetch failed");
                manager_for_errors.events.publish(Event::Error(Arc::new(err)));
            });

            workers.push(Worker::spawn(
                normalized.new_job_check_interval,
                fetcher,
                responder,
                error_sink,
            ));
        }

        Ok(())
    }

    async fn sweep_expired(&self) -> QueueResult<()> {
        let count = self.executor.expire_jobs().await?;
        if count > 0 {
            #[cfg(feature = "tracing")]
            tracing::info!(count, "expiration sweep reverted jobs");
            self.events.publish(Event::Expired { count });
        }
        Ok(())
    }

    /// Run an initial expiration sweep, then arm a recurring timer at
    /// `config.expire_check_interval`. Errors during a sweep are emitted
    /// as `error` events; the monitor always re-arms regardless (see the
    /// Open Question decision in `DESIGN.md`).
    pub async fn monitor(&self) -> QueueResult<()> {
        self.sweep_expired().await?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let interval = self.config.expire_check_interval;

        let task_stop = stop_flag.clone();
        let task_wake = wake.clone();
        let manager = self.clone();
        let task = tokio::spawn(async move {
            loop {
                if task_stop.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = task_wake.notified() => {}
                }

                if task_stop.load(Ordering::Acquire) {
                    break;
                }

                if let Err(source) = manager.sweep_expired().await {
                    #[cfg(feature = "tracing")]
                    tracing::error!(%source, "expiration sweep failed");
                    manager
                        .events
                        .publish(Event::Error(Arc::new(EventError::Monitor { source })));
                }
            }
        });

        *self.monitor.lock().unwrap() = Some(MonitorHandle {
            stop_flag,
            wake,
            task,
        });
        Ok(())
    }

    /// Stop every worker and clear the registry. Idempotent.
    pub fn close(&self) {
        let mut workers = self.workers.lock().unwrap();
        for worker in workers.drain(..) {
            worker.stop();
        }
    }

    /// `close`, plus stop the monitor and mark the manager stopped so no
    /// further `subscribe` calls succeed. Idempotent.
    pub fn stop(&self) {
        self.close();
        self.stopped.store(true, Ordering::Release);
        if let Some(monitor) = self.monitor.lock().unwrap().take() {
            monitor.stop();
        }
    }
}
