use crate::job::JobId;

/// The error taxonomy for every fallible public operation.
///
/// Background tasks (the [`crate::worker::Worker`] loop, the expiration
/// monitor) never return these to a caller; they convert them into
/// [`crate::events::Event::Error`] instead, so every asynchronous failure
/// still has exactly one observable surface.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// A synchronous validation failure: missing name, out-of-range
    /// interval, non-serializable payload, zero team size, and so on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `complete`/`cancel` affected zero rows.
    #[error("job {id} not found")]
    NotFound {
        /// The id that was asserted to affect exactly one row.
        id: JobId,
    },

    /// Propagated unchanged from the executor.
    #[cfg(feature = "sqlite")]
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Propagated unchanged from the executor, when the `sqlite` feature
    /// (and thus the concrete `sqlx::Error` variant) is not compiled in.
    #[cfg(not(feature = "sqlite"))]
    #[error("storage error: {0}")]
    Storage(String),

    /// The job payload could not be serialized to the wire format.
    #[error("failed to serialize job data: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type QueueResult<T> = Result<T, QueueError>;
