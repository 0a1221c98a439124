use std::fmt::Display;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use task_pool::TaskPool;

use crate::builder::ResourceManagerBuilder;
use crate::content::ContentHashIndex;
use crate::error::ResourceError;
use crate::eviction::{EvictionPlan, EvictionPolicy};
use crate::future::LoadFuture;
use crate::key::{LoadRequest, ModelRequest, ResourceKey, ResourceSource, TextureRequest};
#[cfg(feature = "metrics")]
use crate::metrics::{CacheMetrics, Counters};
use crate::traits::{BoxError, Priority, Resource, ResourceBackend, ResourceKind};
use crate::weak_cache::WeakCache;

/// How often [`ResourceManager::wait_for_all`] re-checks the pending count.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Everything one resource class owns. Only touched under the class mutex.
struct ClassState<R> {
	cache: WeakCache<ResourceKey, R>,
	hashes: ContentHashIndex,
	/// Byte ceiling, 0 = unbounded
	budget: u64,
	#[cfg(feature = "metrics")]
	counters: Counters,
}

impl<R> ClassState<R> {
	/// Upgrade `key` and refresh its recency and tier.
	fn hit(&mut self, key: &ResourceKey, priority: Priority) -> Option<Arc<R>> {
		let resource = self.cache.lookup(key)?;
		self.cache.touch(key, priority);
		#[cfg(feature = "metrics")]
		{
			self.counters.hits += 1;
		}
		Some(resource)
	}
}

/// One resource category: its cache, content index and budget behind a single mutex.
///
/// The mutex is held across the whole lookup, construct, evict and insert sequence, so a key
/// is constructed at most once even when many threads ask for it at the same time.
struct ResourceClass<R> {
	kind: ResourceKind,
	state: Mutex<ClassState<R>>,
}

impl<R: Resource> ResourceClass<R> {
	fn new(kind: ResourceKind, budget: u64) -> Self {
		Self {
			kind,
			state: Mutex::new(ClassState {
				cache: WeakCache::new(),
				hashes: ContentHashIndex::new(),
				budget,
				#[cfg(feature = "metrics")]
				counters: Counters::default(),
			}),
		}
	}

	/// Answer `request` from the cache without constructing anything.
	///
	/// Memory requests that miss on their own key fall back to the content-hash index.
	fn resolve_cached<F: Display>(
		&self,
		state: &mut ClassState<R>,
		request: &LoadRequest<F>,
		key: &ResourceKey,
	) -> Option<Arc<R>> {
		if let Some(resource) = state.hit(key, request.priority) {
			tracing::trace!(kind = %self.kind, %key, "cache hit");
			return Some(resource);
		}

		let digest = request.dedup_digest()?;
		let indexed = state.hashes.get(digest).cloned()?;
		match state.hit(&indexed, request.priority) {
			Some(resource) => {
				#[cfg(feature = "metrics")]
				{
					state.counters.dedup_hits += 1;
				}
				tracing::trace!(kind = %self.kind, %key, existing = %indexed, "content dedup hit");
				Some(resource)
			}
			None => {
				state.hashes.remove(digest);
				None
			}
		}
	}

	fn try_resolve<F: Display>(&self, request: &LoadRequest<F>, key: &ResourceKey) -> Option<Arc<R>> {
		let mut state = self.state.lock();
		self.resolve_cached(&mut state, request, key)
	}

	fn load<F, C, G>(
		&self,
		request: &LoadRequest<F>,
		policy: &EvictionPolicy,
		construct: C,
		register: G,
	) -> Result<Arc<R>, ResourceError>
	where
		F: Display,
		C: FnOnce() -> Result<R, BoxError>,
		G: FnOnce(&Arc<R>) -> u32,
	{
		let key = request.key();
		let mut guard = self.state.lock();
		let state = &mut *guard;

		if let Some(resource) = self.resolve_cached(state, request, &key) {
			return Ok(resource);
		}
		#[cfg(feature = "metrics")]
		{
			state.counters.misses += 1;
		}

		let resource = self.admit(state, key.clone(), request.priority, policy, construct, register)?;
		if let Some(digest) = request.dedup_digest() {
			state.hashes.insert(digest, key);
		}
		Ok(resource)
	}

	/// Miss path: construct, make room, insert, register.
	fn admit<C, G>(
		&self,
		state: &mut ClassState<R>,
		key: ResourceKey,
		priority: Priority,
		policy: &EvictionPolicy,
		construct: C,
		register: G,
	) -> Result<Arc<R>, ResourceError>
	where
		C: FnOnce() -> Result<R, BoxError>,
		G: FnOnce(&Arc<R>) -> u32,
	{
		tracing::debug!(kind = %self.kind, %key, ?priority, "cache miss, constructing");
		let resource = match construct() {
			Ok(resource) => resource,
			Err(source) => {
				#[cfg(feature = "metrics")]
				{
					state.counters.construction_failures += 1;
				}
				tracing::debug!(kind = %self.kind, %key, error = %source, "construction failed");
				return Err(ResourceError::Construction {
					kind: self.kind,
					key,
					source,
				});
			}
		};

		let size = resource.memory_footprint_bytes();
		let resource = Arc::new(resource);

		let budget = state.budget;
		let plan = state.cache.enforce_budget(policy, budget, size);
		self.record_eviction(state, &plan, budget);

		state.cache.insert(key.clone(), Arc::downgrade(&resource), size, priority);
		let slot = register(&resource);
		resource.set_slot(slot);
		#[cfg(feature = "metrics")]
		{
			state.counters.inserts += 1;
		}

		tracing::debug!(kind = %self.kind, %key, bytes = size, slot, ?priority, "resource cached");
		Ok(resource)
	}

	#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
	fn record_eviction(&self, state: &mut ClassState<R>, plan: &EvictionPlan<ResourceKey>, budget: u64) {
		if !plan.is_empty() {
			#[cfg(feature = "metrics")]
			{
				state.counters.evictions += plan.victims.len() as u64;
			}
			tracing::debug!(
				kind = %self.kind,
				evicted = plan.victims.len(),
				freed_bytes = plan.freed_bytes,
				remaining_bytes = plan.remaining_bytes,
				budget,
				"evicted resources to fit budget"
			);
		}
		if !plan.satisfied {
			tracing::warn!(
				kind = %self.kind,
				remaining_bytes = plan.remaining_bytes,
				budget,
				"memory budget still exceeded after evicting all non-critical resources"
			);
		}
	}

	fn garbage_collect(&self) -> usize {
		let mut guard = self.state.lock();
		let state = &mut *guard;

		let pruned = state.cache.prune_stale();
		let cache = &state.cache;
		let unmapped = state.hashes.retain_keys(|key| cache.contains_key(key));

		if pruned > 0 || unmapped > 0 {
			tracing::debug!(kind = %self.kind, pruned, unmapped, "garbage collected dead entries");
		}
		pruned
	}

	fn set_budget(&self, bytes: u64, policy: &EvictionPolicy) {
		let mut guard = self.state.lock();
		let state = &mut *guard;

		state.budget = bytes;
		let plan = state.cache.enforce_budget(policy, bytes, 0);
		self.record_eviction(state, &plan, bytes);
		tracing::debug!(kind = %self.kind, budget = bytes, "memory budget updated");
	}

	fn budget(&self) -> u64 {
		self.state.lock().budget
	}

	fn usage(&self) -> u64 {
		self.state.lock().cache.live_usage()
	}

	fn count(&self) -> usize {
		self.state.lock().cache.live_count()
	}

	#[cfg(feature = "metrics")]
	fn metrics(&self) -> CacheMetrics {
		let state = self.state.lock();
		state.counters.snapshot(state.cache.live_usage(), state.budget, state.cache.live_count())
	}
}

/// State shared between the manager and its loader tasks.
struct Inner<B: ResourceBackend> {
	backend: B,
	policy: EvictionPolicy,
	textures: ResourceClass<B::Texture>,
	models: ResourceClass<B::Model>,
}

impl<B: ResourceBackend> Inner<B> {
	fn load_texture(&self, request: &TextureRequest) -> Result<Arc<B::Texture>, ResourceError> {
		let backend = &self.backend;
		self.textures.load(
			request,
			&self.policy,
			|| match &request.source {
				ResourceSource::Path(locator) => backend.load_texture(locator, request.flags),
				ResourceSource::Memory {
					bytes,
					debug_name,
					..
				} => backend.load_texture_from_memory(bytes, debug_name, request.flags),
			},
			|texture| backend.register_texture(texture),
		)
	}

	fn load_model(&self, request: &ModelRequest) -> Result<Arc<B::Model>, ResourceError> {
		let backend = &self.backend;
		self.models.load(
			request,
			&self.policy,
			|| match &request.source {
				ResourceSource::Path(locator) => backend.load_model(locator, request.flags),
				ResourceSource::Memory {
					bytes,
					debug_name,
					..
				} => backend.load_model_from_memory(bytes, debug_name, request.flags),
			},
			|model| backend.register_model(model),
		)
	}
}

/// Dispatch on a [`ResourceKind`] to the matching class.
macro_rules! with_class {
	($inner:expr, $kind:expr, |$class:ident| $body:expr) => {
		match $kind {
			ResourceKind::Texture => {
				let $class = &$inner.textures;
				$body
			}
			ResourceKind::Model => {
				let $class = &$inner.models;
				$body
			}
		}
	};
}

/// Loads textures and models at most once per distinct request and shares them while they
/// are alive.
///
/// The manager holds only weak references: a resource is destroyed as soon as the last
/// `Arc` handed out by the manager is dropped. Each class (textures, models) has its own
/// mutex, byte budget and content-hash index.
///
/// # Loading
///
/// - [`load_texture`](ResourceManager::load_texture) / [`load_model`](ResourceManager::load_model)
///   run on the calling thread and block it for the whole construction on a miss.
/// - [`load_texture_async`](ResourceManager::load_texture_async) /
///   [`load_model_async`](ResourceManager::load_model_async) return a [`LoadFuture`]. If the
///   resource is already cached the future is complete and the loader pool is not involved.
///
/// # Budgets
///
/// When an insert would push a class over its budget, live entries are evicted lowest
/// [`Priority`] first and oldest first within a tier. [`Priority::Critical`] entries are
/// never evicted; if only they remain the class stays over budget.
///
/// # Thread Safety
///
/// `ResourceManager` is `Send + Sync` and is meant to be shared by reference (or in an
/// `Arc`) between render, streaming and gameplay threads.
pub struct ResourceManager<B: ResourceBackend> {
	inner: Arc<Inner<B>>,
	pool: TaskPool,
}

impl<B: ResourceBackend> ResourceManager<B> {
	/// Manager with unbounded budgets and one loader thread per core.
	pub fn new(backend: B) -> Result<Self, ResourceError> {
		ResourceManagerBuilder::new().build(backend)
	}

	pub fn builder() -> ResourceManagerBuilder {
		ResourceManagerBuilder::new()
	}

	pub(crate) fn from_parts(backend: B, texture_budget: u64, model_budget: u64, pool: TaskPool) -> Self {
		Self {
			inner: Arc::new(Inner {
				backend,
				policy: EvictionPolicy,
				textures: ResourceClass::new(ResourceKind::Texture, texture_budget),
				models: ResourceClass::new(ResourceKind::Model, model_budget),
			}),
			pool,
		}
	}

	pub fn backend(&self) -> &B {
		&self.inner.backend
	}

	/// Return the cached texture for `request`, constructing it on a miss.
	///
	/// Backend failures are returned as [`ResourceError::Construction`] and leave the cache
	/// unchanged.
	pub fn load_texture(&self, request: TextureRequest) -> Result<Arc<B::Texture>, ResourceError> {
		self.inner.load_texture(&request)
	}

	/// Return the cached model for `request`, constructing it on a miss.
	pub fn load_model(&self, request: ModelRequest) -> Result<Arc<B::Model>, ResourceError> {
		self.inner.load_model(&request)
	}

	/// Load a texture on the loader pool.
	///
	/// Errors from the load itself are reported by the returned future. This only fails with
	/// [`ResourceError::ShutdownInProgress`] when the texture is not cached and the pool has
	/// been shut down.
	pub fn load_texture_async(
		&self,
		request: TextureRequest,
	) -> Result<LoadFuture<B::Texture>, ResourceError> {
		let key = request.key();
		if let Some(texture) = self.inner.textures.try_resolve(&request, &key) {
			return Ok(LoadFuture::ready(ResourceKind::Texture, key, texture));
		}

		let inner = Arc::clone(&self.inner);
		let handle = self
			.pool
			.submit(move || inner.load_texture(&request))
			.map_err(|_| ResourceError::ShutdownInProgress)?;
		tracing::trace!(kind = %ResourceKind::Texture, %key, "queued async load");
		Ok(LoadFuture::pending(ResourceKind::Texture, key, handle))
	}

	/// Load a model on the loader pool. See [`load_texture_async`](Self::load_texture_async).
	pub fn load_model_async(&self, request: ModelRequest) -> Result<LoadFuture<B::Model>, ResourceError> {
		let key = request.key();
		if let Some(model) = self.inner.models.try_resolve(&request, &key) {
			return Ok(LoadFuture::ready(ResourceKind::Model, key, model));
		}

		let inner = Arc::clone(&self.inner);
		let handle = self
			.pool
			.submit(move || inner.load_model(&request))
			.map_err(|_| ResourceError::ShutdownInProgress)?;
		tracing::trace!(kind = %ResourceKind::Model, %key, "queued async load");
		Ok(LoadFuture::pending(ResourceKind::Model, key, handle))
	}

	/// Drop entries whose resource has already been released. Never evicts live resources.
	///
	/// Returns the number of entries pruned across both classes.
	pub fn garbage_collect(&self) -> usize {
		self.inner.textures.garbage_collect() + self.inner.models.garbage_collect()
	}

	/// Change a class's budget. Lowering it below current usage evicts immediately; 0 disables
	/// eviction.
	pub fn set_memory_budget(&self, kind: ResourceKind, bytes: u64) {
		let policy = &self.inner.policy;
		with_class!(self.inner, kind, |class| class.set_budget(bytes, policy))
	}

	pub fn memory_budget(&self, kind: ResourceKind) -> u64 {
		with_class!(self.inner, kind, |class| class.budget())
	}

	/// Bytes held by live entries of `kind`, recomputed from the entries themselves.
	pub fn memory_usage(&self, kind: ResourceKind) -> u64 {
		with_class!(self.inner, kind, |class| class.usage())
	}

	/// Number of live entries of `kind`, recomputed from the entries themselves.
	pub fn cached_count(&self, kind: ResourceKind) -> usize {
		with_class!(self.inner, kind, |class| class.count())
	}

	#[cfg(feature = "metrics")]
	pub fn metrics(&self, kind: ResourceKind) -> CacheMetrics {
		with_class!(self.inner, kind, |class| class.metrics())
	}

	/// Async loads that are queued or running.
	pub fn pending_count(&self) -> usize {
		self.pool.pending_count()
	}

	pub fn worker_count(&self) -> usize {
		self.pool.num_workers()
	}

	/// Block until every queued and running async load has finished.
	///
	/// Polls; meant for tests and bulk preloading, not for per-frame use. Called from a loader
	/// thread it returns immediately, since waiting there could never finish.
	pub fn wait_for_all(&self) {
		if TaskPool::is_worker_thread() {
			tracing::warn!("wait_for_all called from a loader thread, not waiting");
			return;
		}
		while self.pool.pending_count() > 0 {
			thread::sleep(WAIT_POLL_INTERVAL);
		}
	}

	/// Finish queued async loads and stop the loader threads.
	///
	/// Synchronous loads keep working afterwards. Async loads of resources that are not
	/// already cached fail with [`ResourceError::ShutdownInProgress`].
	pub fn shutdown(&self) {
		self.pool.shutdown();
	}
}

impl<B: ResourceBackend> std::fmt::Debug for ResourceManager<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResourceManager")
			.field("textures", &self.cached_count(ResourceKind::Texture))
			.field("models", &self.cached_count(ResourceKind::Model))
			.field("pool", &self.pool)
			.finish()
	}
}
