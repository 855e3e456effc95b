//! `pgq`: a durable, SQL-backed job queue core.
//!
//! The core ([`Manager`], [`Worker`], [`Plans`], the `attorney` validators)
//! never touches SQL directly; it drives an opaque [`SqlExecutor`]. The
//! `sqlite` feature (on by default) ships [`SqliteExecutor`], a concrete
//! executor over `sqlx::SqlitePool`.
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # async fn demo() -> pgq::QueueResult<()> {
//! use pgq::{Config, Manager, PublishOptions, SqliteExecutor};
//!
//! let executor = SqliteExecutor::connect("sqlite::memory:", "pgq").await?;
//! executor.migrate().await?;
//! let manager = Manager::new(executor, Config::default());
//!
//! manager
//!     .publish("email", serde_json::json!({"to": "a"}), PublishOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod attorney;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod id;
pub mod interval;
pub mod job;
pub mod manager;
pub mod plans;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod worker;

pub use attorney::{PublishOptions, SubscribeOptions};
pub use config::{Config, ConfigBuilder, UuidVersion};
pub use error::{QueueError, QueueResult};
pub use events::{Event, EventError};
pub use executor::SqlExecutor;
pub use id::{IdFactory, UuidV1Factory, UuidV4Factory};
pub use job::{Interval, Job, JobId, JobState};
pub use manager::{Callback, JobHandle, Manager, PublishRequest};
pub use plans::Plans;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;
pub use worker::Worker;
