use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use task_pool::{TaskError, TaskHandle};

use crate::error::ResourceError;
use crate::key::ResourceKey;
use crate::traits::ResourceKind;

/// Result of an asynchronous load.
///
/// Construction failures and loader panics are stored and surface only when the future is
/// waited on or awaited.
///
/// # Example
///
/// ```ignore
/// let pending = manager.load_texture_async(TextureRequest::path("tex.png"))?;
/// // ... do other work ...
/// let texture = pending.wait()?;
/// ```
pub struct LoadFuture<R> {
	kind: ResourceKind,
	key: ResourceKey,
	handle: TaskHandle<Result<Arc<R>, ResourceError>>,
}

impl<R> LoadFuture<R> {
	pub(crate) fn ready(kind: ResourceKind, key: ResourceKey, resource: Arc<R>) -> Self {
		Self {
			kind,
			key,
			handle: TaskHandle::ready(Ok(resource)),
		}
	}

	pub(crate) fn pending(
		kind: ResourceKind,
		key: ResourceKey,
		handle: TaskHandle<Result<Arc<R>, ResourceError>>,
	) -> Self {
		Self {
			kind,
			key,
			handle,
		}
	}

	/// Key of the resource being loaded.
	pub fn key(&self) -> &ResourceKey {
		&self.key
	}

	pub fn kind(&self) -> ResourceKind {
		self.kind
	}

	/// Whether the result is available without blocking.
	pub fn is_ready(&self) -> bool {
		self.handle.is_finished()
	}

	/// Block until the load finishes.
	pub fn wait(self) -> Result<Arc<R>, ResourceError> {
		let Self {
			kind,
			key,
			handle,
		} = self;
		flatten(kind, key, handle.wait())
	}

	/// Block for at most `timeout`. Returns `true` if the result is available.
	pub fn wait_timeout(&self, timeout: Duration) -> bool {
		self.handle.wait_timeout(timeout)
	}
}

impl<R> Future for LoadFuture<R> {
	type Output = Result<Arc<R>, ResourceError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = &mut *self;
		match Pin::new(&mut this.handle).poll(cx) {
			Poll::Ready(result) => Poll::Ready(flatten(this.kind, this.key.clone(), result)),
			Poll::Pending => Poll::Pending,
		}
	}
}

impl<R> std::fmt::Debug for LoadFuture<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LoadFuture")
			.field("kind", &self.kind)
			.field("key", &self.key)
			.field("ready", &self.is_ready())
			.finish()
	}
}

fn flatten<R>(
	kind: ResourceKind,
	key: ResourceKey,
	result: Result<Result<Arc<R>, ResourceError>, TaskError>,
) -> Result<Arc<R>, ResourceError> {
	match result {
		Ok(loaded) => loaded,
		Err(TaskError::Panicked(message)) => Err(ResourceError::TaskPanicked {
			kind,
			key,
			message,
		}),
		Err(TaskError::Abandoned) => Err(ResourceError::TaskAbandoned {
			kind,
			key,
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ready_future_resolves_immediately() {
		let future = LoadFuture::ready(ResourceKind::Texture, ResourceKey::from("a"), Arc::new(3u8));
		assert!(future.is_ready());
		assert_eq!(future.wait().ok().as_deref(), Some(&3));
	}

	#[test]
	fn test_panic_maps_to_task_panicked() {
		let (completer, handle) = task_pool::channel::<Result<Arc<u8>, ResourceError>>();
		completer.complete(Err(TaskError::Panicked("boom".into())));

		let future = LoadFuture::pending(ResourceKind::Model, ResourceKey::from("m"), handle);
		match future.wait() {
			Err(ResourceError::TaskPanicked {
				kind,
				message,
				..
			}) => {
				assert_eq!(kind, ResourceKind::Model);
				assert_eq!(message, "boom");
			}
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn test_dropped_completer_maps_to_abandoned() {
		let (completer, handle) = task_pool::channel::<Result<Arc<u8>, ResourceError>>();
		drop(completer);

		let future = LoadFuture::pending(ResourceKind::Texture, ResourceKey::from("t"), handle);
		assert!(matches!(future.wait(), Err(ResourceError::TaskAbandoned { .. })));
	}
}
