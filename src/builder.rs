use task_pool::TaskPool;

use crate::error::ResourceError;
use crate::manager::ResourceManager;
use crate::traits::ResourceBackend;

const DEFAULT_THREAD_NAME: &str = "resource-loader";

/// Builder for configuring a [`ResourceManager`].
///
/// # Example
///
/// ```ignore
/// use resource_cache::ResourceManagerBuilder;
///
/// let manager = ResourceManagerBuilder::new()
///     .texture_budget(512 * 1024 * 1024) // 512 MB
///     .model_budget(128 * 1024 * 1024)
///     .workers(4)
///     .build(backend)?;
/// ```
///
/// # Defaults
///
/// - Budgets: 0 for both classes, meaning unbounded
/// - Workers: hardware concurrency, or 1 when it cannot be determined
/// - Thread names: `resource-loader-{index}`
#[derive(Debug, Clone)]
pub struct ResourceManagerBuilder {
	texture_budget: u64,
	model_budget: u64,
	workers: Option<usize>,
	thread_name: String,
}

impl ResourceManagerBuilder {
	pub fn new() -> Self {
		Self {
			texture_budget: 0,
			model_budget: 0,
			workers: None,
			thread_name: DEFAULT_THREAD_NAME.to_string(),
		}
	}

	/// Byte budget for textures. 0 disables eviction.
	pub fn texture_budget(mut self, bytes: u64) -> Self {
		self.texture_budget = bytes;
		self
	}

	/// Byte budget for models. 0 disables eviction.
	pub fn model_budget(mut self, bytes: u64) -> Self {
		self.model_budget = bytes;
		self
	}

	/// Number of loader threads. 0 is treated as 1.
	pub fn workers(mut self, count: usize) -> Self {
		self.workers = Some(count);
		self
	}

	/// Prefix for loader thread names.
	pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
		self.thread_name = prefix.into();
		self
	}

	/// Spawn the loader threads and build the manager around `backend`.
	pub fn build<B: ResourceBackend>(self, backend: B) -> Result<ResourceManager<B>, ResourceError> {
		let workers = self.workers.unwrap_or_else(TaskPool::default_parallelism).max(1);
		let pool =
			TaskPool::with_thread_name(workers, &self.thread_name).map_err(ResourceError::WorkerSpawn)?;

		tracing::debug!(
			workers,
			texture_budget = self.texture_budget,
			model_budget = self.model_budget,
			"resource manager created"
		);

		Ok(ResourceManager::from_parts(backend, self.texture_budget, self.model_budget, pool))
	}
}

impl Default for ResourceManagerBuilder {
	fn default() -> Self {
		Self::new()
	}
}
