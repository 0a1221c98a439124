use std::any::Any;
use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::error::{ShutdownError, TaskError};
use crate::handle::{TaskHandle, channel};

type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
	static IN_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Queue state guarded by a single mutex so the shutdown flag and the job list are
/// always observed together.
struct Queue {
	jobs: VecDeque<Job>,
	shutdown: bool,
}

struct Shared {
	queue: Mutex<Queue>,
	/// Signalled on every submit (one waiter) and on shutdown (all waiters)
	available: Condvar,
	/// Queued plus in-flight tasks
	pending: AtomicUsize,
}

/// Fixed-size pool of persistent worker threads.
///
/// Tasks run in FIFO dispatch order, but tasks handed to different workers may finish in
/// any order. There is no cancellation: a task that has been accepted always runs to
/// completion or panic.
///
/// # Shutdown
///
/// [`shutdown`](TaskPool::shutdown) stops accepting work, lets the workers drain whatever
/// is still queued and joins them. Dropping the pool does the same.
pub struct TaskPool {
	shared: Arc<Shared>,
	workers: Mutex<Vec<JoinHandle<()>>>,
	worker_ids: Vec<ThreadId>,
	num_workers: usize,
}

impl TaskPool {
	/// Spawn a pool with `num_workers` threads (at least one).
	pub fn new(num_workers: usize) -> io::Result<Self> {
		Self::with_thread_name(num_workers, "task-pool")
	}

	/// Spawn a pool whose threads are named `{prefix}-{index}`.
	pub fn with_thread_name(num_workers: usize, prefix: &str) -> io::Result<Self> {
		let num_workers = num_workers.max(1);
		let shared = Arc::new(Shared {
			queue: Mutex::new(Queue {
				jobs: VecDeque::new(),
				shutdown: false,
			}),
			available: Condvar::new(),
			pending: AtomicUsize::new(0),
		});

		let mut workers = Vec::with_capacity(num_workers);
		for index in 0..num_workers {
			let shared_for_worker = Arc::clone(&shared);
			let spawned = thread::Builder::new()
				.name(format!("{prefix}-{index}"))
				.spawn(move || worker_loop(shared_for_worker));

			match spawned {
				Ok(handle) => workers.push(handle),
				Err(err) => {
					// Release the threads that did start before reporting.
					shared.queue.lock().shutdown = true;
					shared.available.notify_all();
					for handle in workers {
						let _ = handle.join();
					}
					return Err(err);
				}
			}
		}

		tracing::debug!(workers = num_workers, prefix, "task pool started");

		let worker_ids = workers.iter().map(|handle| handle.thread().id()).collect();
		Ok(Self {
			shared,
			workers: Mutex::new(workers),
			worker_ids,
			num_workers,
		})
	}

	/// Hardware concurrency, falling back to 1 when it cannot be determined.
	pub fn default_parallelism() -> usize {
		thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
	}

	/// Whether the calling thread is a worker of some `TaskPool`.
	pub fn is_worker_thread() -> bool {
		IN_WORKER.with(Cell::get)
	}

	/// Enqueue `task` and wake one idle worker.
	///
	/// Returns [`ShutdownError`] if [`shutdown`](TaskPool::shutdown) has already been called;
	/// the task is not run in that case.
	pub fn submit<F, T>(&self, task: F) -> Result<TaskHandle<T>, ShutdownError>
	where
		F: FnOnce() -> T + Send + 'static,
		T: Send + 'static,
	{
		let (completer, handle) = channel();
		let job: Job = Box::new(move || {
			let result = panic::catch_unwind(AssertUnwindSafe(task)).map_err(|payload| {
				let message = panic_message(payload.as_ref());
				tracing::error!(%message, "task panicked");
				TaskError::Panicked(message)
			});
			completer.complete(result);
		});

		{
			let mut queue = self.shared.queue.lock();
			if queue.shutdown {
				return Err(ShutdownError);
			}
			self.shared.pending.fetch_add(1, Ordering::AcqRel);
			queue.jobs.push_back(job);
		}
		self.shared.available.notify_one();

		Ok(handle)
	}

	/// Number of tasks that are queued or currently running.
	pub fn pending_count(&self) -> usize {
		self.shared.pending.load(Ordering::Acquire)
	}

	/// Number of worker threads.
	pub fn num_workers(&self) -> usize {
		self.num_workers
	}

	/// Whether [`shutdown`](TaskPool::shutdown) has been called.
	pub fn is_shut_down(&self) -> bool {
		self.shared.queue.lock().shutdown
	}

	/// Stop accepting tasks, drain the queue and join the workers.
	///
	/// Idempotent. Every caller blocks until the queue is drained and the workers have exited,
	/// including callers racing with another `shutdown`. When called from one of the pool's
	/// own workers it only flags the pool and returns: that worker exits on its own once the
	/// queue is empty.
	pub fn shutdown(&self) {
		self.shared.queue.lock().shutdown = true;
		self.shared.available.notify_all();

		if self.worker_ids.contains(&thread::current().id()) {
			return;
		}

		// Held across the joins so a concurrent caller waits for the drain too.
		let mut workers = self.workers.lock();
		if workers.is_empty() {
			return;
		}
		for handle in workers.drain(..) {
			let name = handle.thread().name().map(str::to_owned);
			if handle.join().is_err() {
				tracing::error!(worker = ?name, "worker thread terminated abnormally");
			}
		}

		tracing::debug!(workers = self.num_workers, "task pool shut down");
	}
}

impl Drop for TaskPool {
	fn drop(&mut self) {
		self.shutdown();
	}
}

impl std::fmt::Debug for TaskPool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TaskPool")
			.field("num_workers", &self.num_workers)
			.field("pending", &self.pending_count())
			.finish()
	}
}

fn worker_loop(shared: Arc<Shared>) {
	IN_WORKER.with(|flag| flag.set(true));

	loop {
		let job = {
			let mut queue = shared.queue.lock();
			loop {
				if let Some(job) = queue.jobs.pop_front() {
					break Some(job);
				}
				if queue.shutdown {
					break None;
				}
				shared.available.wait(&mut queue);
			}
		};

		let Some(job) = job else {
			break;
		};

		// Panics are caught inside the job, so the worker survives every task.
		job();
		shared.pending.fetch_sub(1, Ordering::AcqRel);
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_owned()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		String::from("non-string panic payload")
	}
}
