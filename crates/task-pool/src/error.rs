use thiserror::Error;

/// Failure delivered through a [`TaskHandle`](crate::TaskHandle) instead of a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
	/// The task panicked. The worker caught the panic and carried on.
	#[error("task panicked: {0}")]
	Panicked(String),

	/// The completer was dropped without ever producing a result.
	#[error("task was dropped before it produced a result")]
	Abandoned,
}

/// Returned by [`TaskPool::submit`](crate::TaskPool::submit) once the pool has been shut down.
///
/// Submissions are rejected rather than silently dropped so callers never wait on a handle
/// that no worker will ever complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("task pool is shut down")]
pub struct ShutdownError;
