//! Keyed store of non-owning references.
//!
//! The cache only ever holds `Weak` handles: a resource lives exactly as long as its external
//! strong holders do. Entries whose resource has died stay in the map until a lookup or
//! [`WeakCache::prune_stale`] discovers them.
//!
//! Not thread-safe on its own; the resource manager keeps each cache behind its class mutex.

use std::hash::Hash;
use std::sync::{Arc, Weak};

use ahash::RandomState;
use hashbrown::HashMap;

use crate::eviction::{EvictionPlan, EvictionPolicy};
use crate::traits::Priority;

/// Bookkeeping for one cached entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo<K> {
	pub key: K,
	/// Footprint reported by the resource when it was inserted
	pub memory_size: u64,
	/// Logical timestamp of the last insert or hit. Strictly increasing per cache.
	pub last_access: u64,
	pub priority: Priority,
}

struct Entry<K, V> {
	resource: Weak<V>,
	info: ResourceInfo<K>,
}

impl<K, V> Entry<K, V> {
	fn is_live(&self) -> bool {
		self.resource.strong_count() > 0
	}
}

/// Map from key to weak resource handle plus [`ResourceInfo`].
pub struct WeakCache<K, V> {
	entries: HashMap<K, Entry<K, V>, RandomState>,
	/// Sum of `memory_size` over all entries, dead ones included until they are pruned
	tracked_bytes: u64,
	/// Monotonic access clock
	clock: u64,
}

impl<K, V> WeakCache<K, V>
where
	K: Hash + Eq + Clone,
{
	pub fn new() -> Self {
		Self {
			entries: HashMap::with_hasher(RandomState::new()),
			tracked_bytes: 0,
			clock: 0,
		}
	}

	fn tick(&mut self) -> u64 {
		self.clock += 1;
		self.clock
	}

	/// Upgrade the entry for `key`.
	///
	/// A present but dead entry is removed as a side effect. Does not refresh recency; see
	/// [`touch`](WeakCache::touch).
	pub fn lookup(&mut self, key: &K) -> Option<Arc<V>> {
		let entry = self.entries.get(key)?;
		if let Some(resource) = entry.resource.upgrade() {
			return Some(resource);
		}
		self.remove(key);
		None
	}

	/// Mark `key` as just used and raise its tier to at least `priority`.
	///
	/// Returns `false` if there is no entry for `key`.
	pub fn touch(&mut self, key: &K, priority: Priority) -> bool {
		let now = self.tick();
		match self.entries.get_mut(key) {
			Some(entry) => {
				entry.info.last_access = now;
				entry.info.priority = entry.info.priority.max(priority);
				true
			}
			None => false,
		}
	}

	/// Store a weak handle for `key`, replacing any previous entry.
	///
	/// Returns the replaced entry's info.
	pub fn insert(
		&mut self,
		key: K,
		resource: Weak<V>,
		memory_size: u64,
		priority: Priority,
	) -> Option<ResourceInfo<K>> {
		let info = ResourceInfo {
			key: key.clone(),
			memory_size,
			last_access: self.tick(),
			priority,
		};
		self.tracked_bytes = self.tracked_bytes.saturating_add(memory_size);
		let old = self.entries.insert(
			key,
			Entry {
				resource,
				info,
			},
		)?;
		self.tracked_bytes = self.tracked_bytes.saturating_sub(old.info.memory_size);
		Some(old.info)
	}

	/// Drop the entry for `key` unconditionally.
	pub fn remove(&mut self, key: &K) -> Option<ResourceInfo<K>> {
		let entry = self.entries.remove(key)?;
		self.tracked_bytes = self.tracked_bytes.saturating_sub(entry.info.memory_size);
		Some(entry.info)
	}

	/// Remove every entry whose resource has died. Returns how many were removed.
	pub fn prune_stale(&mut self) -> usize {
		let before = self.entries.len();
		let mut released: u64 = 0;
		self.entries.retain(|_, entry| {
			let live = entry.is_live();
			if !live {
				released = released.saturating_add(entry.info.memory_size);
			}
			live
		});
		self.tracked_bytes = self.tracked_bytes.saturating_sub(released);
		before - self.entries.len()
	}

	/// Evict live entries per `policy` until `live_usage() + incoming_bytes` fits `budget_bytes`.
	///
	/// `incoming_bytes` accounts for an entry about to be inserted; it is not itself a
	/// candidate. A budget of 0 disables eviction.
	pub fn enforce_budget(
		&mut self,
		policy: &EvictionPolicy,
		budget_bytes: u64,
		incoming_bytes: u64,
	) -> EvictionPlan<K> {
		let current = self.live_usage().saturating_add(incoming_bytes);
		let plan = policy.plan(self.live_infos(), current, budget_bytes);
		for key in &plan.victims {
			self.remove(key);
		}
		plan
	}

	/// Info for `key`, live or not.
	pub fn info(&self, key: &K) -> Option<&ResourceInfo<K>> {
		self.entries.get(key).map(|entry| &entry.info)
	}

	pub fn contains_key(&self, key: &K) -> bool {
		self.entries.contains_key(key)
	}

	/// Infos of entries whose resource is still alive.
	pub fn live_infos(&self) -> impl Iterator<Item = &ResourceInfo<K>> {
		self.entries.values().filter(|entry| entry.is_live()).map(|entry| &entry.info)
	}

	/// Bytes held by entries whose resource is still alive, recomputed on every call.
	///
	/// Saturates at `u64::MAX` rather than overflowing on absurd footprints.
	pub fn live_usage(&self) -> u64 {
		self.live_infos().fold(0, |total, info| total.saturating_add(info.memory_size))
	}

	/// Number of entries whose resource is still alive, recomputed on every call.
	pub fn live_count(&self) -> usize {
		self.live_infos().count()
	}

	/// Running total over all entries, including dead ones not yet pruned.
	pub fn tracked_bytes(&self) -> u64 {
		self.tracked_bytes
	}

	/// Number of entries, including dead ones not yet pruned.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl<K, V> Default for WeakCache<K, V>
where
	K: Hash + Eq + Clone,
{
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, PartialEq)]
	struct Blob(u64);

	fn insert(cache: &mut WeakCache<u32, Blob>, key: u32, size: u64, priority: Priority) -> Arc<Blob> {
		let blob = Arc::new(Blob(size));
		cache.insert(key, Arc::downgrade(&blob), size, priority);
		blob
	}

	#[test]
	fn test_lookup_live_entry() {
		let mut cache = WeakCache::new();
		let blob = insert(&mut cache, 1, 100, Priority::Normal);

		let found = cache.lookup(&1).expect("entry should be live");
		assert!(Arc::ptr_eq(&found, &blob));
		assert!(cache.lookup(&2).is_none());
	}

	#[test]
	fn test_cache_does_not_own() {
		let mut cache = WeakCache::new();
		let blob = insert(&mut cache, 1, 100, Priority::Normal);
		assert_eq!(Arc::strong_count(&blob), 1);

		drop(blob);
		assert_eq!(cache.live_count(), 0);
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn test_lookup_removes_stale_entry() {
		let mut cache = WeakCache::new();
		drop(insert(&mut cache, 1, 100, Priority::Normal));

		assert!(cache.lookup(&1).is_none());
		assert!(!cache.contains_key(&1));
		assert_eq!(cache.tracked_bytes(), 0);
	}

	#[test]
	fn test_prune_stale_counts_and_adjusts_total() {
		let mut cache = WeakCache::new();
		let keep = insert(&mut cache, 1, 100, Priority::Normal);
		drop(insert(&mut cache, 2, 200, Priority::Normal));
		drop(insert(&mut cache, 3, 300, Priority::Normal));
		assert_eq!(cache.tracked_bytes(), 600);

		assert_eq!(cache.prune_stale(), 2);
		assert_eq!(cache.tracked_bytes(), 100);
		assert_eq!(cache.len(), 1);
		assert_eq!(cache.prune_stale(), 0);
		drop(keep);
	}

	#[test]
	fn test_insert_overwrites() {
		let mut cache = WeakCache::new();
		let _first = insert(&mut cache, 1, 100, Priority::Normal);
		let second = Arc::new(Blob(250));
		let old = cache.insert(1, Arc::downgrade(&second), 250, Priority::High);

		assert_eq!(old.map(|info| info.memory_size), Some(100));
		assert_eq!(cache.tracked_bytes(), 250);
		assert_eq!(cache.info(&1).map(|info| info.priority), Some(Priority::High));
	}

	#[test]
	fn test_touch_refreshes_recency_and_promotes() {
		let mut cache = WeakCache::new();
		let _a = insert(&mut cache, 1, 10, Priority::Low);
		let _b = insert(&mut cache, 2, 10, Priority::Normal);
		let before = cache.info(&1).map(|info| info.last_access);

		assert!(cache.touch(&1, Priority::High));
		let after = cache.info(&1).expect("entry exists");
		assert!(Some(after.last_access) > before);
		assert!(after.last_access > cache.info(&2).expect("entry exists").last_access);
		assert_eq!(after.priority, Priority::High);

		// A lower request never demotes.
		cache.touch(&1, Priority::Low);
		assert_eq!(cache.info(&1).map(|info| info.priority), Some(Priority::High));
		assert!(!cache.touch(&99, Priority::Normal));
	}

	#[test]
	fn test_live_usage_ignores_dead_entries() {
		let mut cache = WeakCache::new();
		let _a = insert(&mut cache, 1, 100, Priority::Normal);
		drop(insert(&mut cache, 2, 900, Priority::Normal));

		assert_eq!(cache.live_usage(), 100);
		assert_eq!(cache.tracked_bytes(), 1000);
	}

	#[test]
	fn test_enforce_budget_accounts_for_incoming() {
		let mut cache = WeakCache::new();
		let _r1 = insert(&mut cache, 1, 600, Priority::Normal);

		let plan = cache.enforce_budget(&EvictionPolicy, 1000, 600);
		assert_eq!(plan.victims, vec![1]);
		assert!(plan.satisfied);
		assert!(cache.lookup(&1).is_none());
	}

	#[test]
	fn test_huge_footprints_saturate() {
		let mut cache = WeakCache::new();
		let _a = insert(&mut cache, 1, u64::MAX - 10, Priority::Normal);
		let _b = insert(&mut cache, 2, 100, Priority::Normal);

		assert_eq!(cache.live_usage(), u64::MAX);
		assert_eq!(cache.tracked_bytes(), u64::MAX);

		let plan = cache.enforce_budget(&EvictionPolicy, 1000, 50);
		assert!(plan.satisfied);
		assert_eq!(cache.live_count(), 1);
		assert!(cache.remove(&2).is_some());
		assert!(cache.is_empty());
	}

	#[test]
	fn test_enforce_budget_keeps_critical() {
		let mut cache = WeakCache::new();
		let _c = insert(&mut cache, 1, 800, Priority::Critical);
		let _n = insert(&mut cache, 2, 800, Priority::Normal);

		let plan = cache.enforce_budget(&EvictionPolicy, 500, 0);
		assert_eq!(plan.victims, vec![2]);
		assert!(!plan.satisfied);
		assert_eq!(cache.live_usage(), 800);
	}
}
