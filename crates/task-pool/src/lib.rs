//! # Task Pool
//!
//! A fixed set of persistent worker threads draining a FIFO queue of boxed closures.
//!
//! - **FIFO dispatch**: tasks are handed to idle workers in submission order
//! - **Write-once results**: every submission returns a [`TaskHandle`] that can be waited on,
//!   polled, or `.await`ed
//! - **Panic isolation**: a panicking task resolves its handle with [`TaskError::Panicked`];
//!   the worker keeps running
//! - **Graceful shutdown**: [`TaskPool::shutdown`] lets workers drain the queue before joining
//!
//! ## Quick Start
//!
//! ```rust
//! use task_pool::TaskPool;
//!
//! let pool = TaskPool::new(2).expect("spawn workers");
//!
//! let handle = pool.submit(|| 6 * 7).expect("pool is running");
//! assert_eq!(handle.wait(), Ok(42));
//!
//! pool.shutdown();
//! assert!(pool.submit(|| ()).is_err());
//! ```

mod error;
mod handle;
mod pool;

pub use error::{ShutdownError, TaskError};
pub use handle::{Completer, TaskHandle, channel};
pub use pool::TaskPool;
