use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::TaskError;

/// Shared single-assignment result cell.
struct Slot<T> {
	state: Mutex<State<T>>,
	ready: Condvar,
}

struct State<T> {
	/// Set exactly once by the completer
	result: Option<Result<T, TaskError>>,
	/// True once `result` has been written, even after the awaiter took it
	filled: bool,
	/// Waker registered by the last `poll` that returned `Pending`
	waker: Option<Waker>,
}

impl<T> Slot<T> {
	fn new(result: Option<Result<T, TaskError>>) -> Self {
		let filled = result.is_some();
		Self {
			state: Mutex::new(State {
				result,
				filled,
				waker: None,
			}),
			ready: Condvar::new(),
		}
	}

	fn fill(&self, result: Result<T, TaskError>) {
		let waker = {
			let mut state = self.state.lock();
			if state.filled {
				return;
			}
			state.result = Some(result);
			state.filled = true;
			state.waker.take()
		};
		self.ready.notify_all();
		if let Some(waker) = waker {
			waker.wake();
		}
	}
}

/// Write side of a [`TaskHandle`]. Completes the handle at most once.
///
/// Dropping a completer without calling [`complete`](Completer::complete) resolves the
/// handle with [`TaskError::Abandoned`].
pub struct Completer<T> {
	slot: Option<Arc<Slot<T>>>,
}

impl<T> Completer<T> {
	/// Store the result and wake whoever is waiting on the handle.
	pub fn complete(mut self, result: Result<T, TaskError>) {
		if let Some(slot) = self.slot.take() {
			slot.fill(result);
		}
	}
}

impl<T> Drop for Completer<T> {
	fn drop(&mut self) {
		if let Some(slot) = self.slot.take() {
			slot.fill(Err(TaskError::Abandoned));
		}
	}
}

/// Read side of a task result.
///
/// Supports blocking waits from plain threads as well as `.await` from async code.
///
/// # Example
///
/// ```
/// use std::thread;
///
/// let (completer, handle) = task_pool::channel();
/// thread::spawn(move || completer.complete(Ok("done")));
///
/// assert_eq!(handle.wait(), Ok("done"));
/// ```
pub struct TaskHandle<T> {
	slot: Arc<Slot<T>>,
}

/// Create a connected completer/handle pair.
pub fn channel<T>() -> (Completer<T>, TaskHandle<T>) {
	let slot = Arc::new(Slot::new(None));
	(
		Completer {
			slot: Some(Arc::clone(&slot)),
		},
		TaskHandle { slot },
	)
}

impl<T> TaskHandle<T> {
	/// A handle that is already resolved with `value`.
	pub fn ready(value: T) -> Self {
		Self {
			slot: Arc::new(Slot::new(Some(Ok(value)))),
		}
	}

	/// A handle that is already resolved with `error`.
	pub fn failed(error: TaskError) -> Self {
		Self {
			slot: Arc::new(Slot::new(Some(Err(error)))),
		}
	}

	/// Whether a result is available. Never blocks.
	pub fn is_finished(&self) -> bool {
		self.slot.state.lock().filled
	}

	/// Block the calling thread until the result is available.
	///
	/// Do not call this from inside a task running on the same pool with a single worker:
	/// the task being waited on can never be scheduled.
	pub fn wait(self) -> Result<T, TaskError> {
		let mut state = self.slot.state.lock();
		loop {
			if let Some(result) = state.result.take() {
				return result;
			}
			if state.filled {
				// Already consumed by a `poll` that completed.
				return Err(TaskError::Abandoned);
			}
			self.slot.ready.wait(&mut state);
		}
	}

	/// Block for at most `timeout`. Returns `true` if the result is available.
	pub fn wait_timeout(&self, timeout: Duration) -> bool {
		let mut state = self.slot.state.lock();
		if !state.filled {
			let _ = self.slot.ready.wait_while_for(&mut state, |state| !state.filled, timeout);
		}
		state.filled
	}
}

impl<T> Future for TaskHandle<T> {
	type Output = Result<T, TaskError>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let mut state = self.slot.state.lock();
		if let Some(result) = state.result.take() {
			return Poll::Ready(result);
		}
		if state.filled {
			return Poll::Ready(Err(TaskError::Abandoned));
		}
		match &mut state.waker {
			Some(waker) if waker.will_wake(cx.waker()) => {}
			waker => *waker = Some(cx.waker().clone()),
		}
		Poll::Pending
	}
}

impl<T> std::fmt::Debug for TaskHandle<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TaskHandle").field("finished", &self.is_finished()).finish()
	}
}

#[cfg(test)]
mod tests {
	use std::thread;

	use super::*;

	#[test]
	fn test_ready_handle_is_finished() {
		let handle = TaskHandle::ready(7);
		assert!(handle.is_finished());
		assert_eq!(handle.wait(), Ok(7));
	}

	#[test]
	fn test_failed_handle_resolves_with_error() {
		let handle = TaskHandle::<u8>::failed(TaskError::Panicked("decode".into()));
		assert!(handle.is_finished());
		assert!(handle.wait_timeout(Duration::ZERO));
		assert_eq!(handle.wait(), Err(TaskError::Panicked("decode".into())));
	}

	#[test]
	fn test_complete_from_other_thread() {
		let (completer, handle) = channel();
		let worker = thread::spawn(move || {
			thread::sleep(Duration::from_millis(10));
			completer.complete(Ok(String::from("texture")));
		});

		assert_eq!(handle.wait().as_deref(), Ok("texture"));
		worker.join().expect("thread should not panic");
	}

	#[test]
	fn test_dropped_completer_abandons_handle() {
		let (completer, handle) = channel::<u32>();
		drop(completer);

		assert!(handle.is_finished());
		assert_eq!(handle.wait(), Err(TaskError::Abandoned));
	}

	#[test]
	fn test_first_result_wins() {
		let (completer, handle) = channel();
		completer.complete(Ok(1));
		// The slot is already filled; a second fill is ignored.
		handle.slot.fill(Ok(2));

		assert_eq!(handle.wait(), Ok(1));
	}

	#[test]
	fn test_wait_timeout_reports_pending() {
		let (completer, handle) = channel::<()>();
		assert!(!handle.wait_timeout(Duration::from_millis(5)));

		completer.complete(Ok(()));
		assert!(handle.wait_timeout(Duration::from_millis(5)));
	}

	#[tokio::test]
	async fn test_await_handle() {
		let (completer, handle) = channel();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(5)).await;
			completer.complete(Ok(99u64));
		});

		assert_eq!(handle.await, Ok(99));
	}
}
