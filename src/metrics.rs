//! Per-class cache metrics (feature `metrics`).

/// Snapshot of one resource class's counters.
///
/// # Example
///
/// ```ignore
/// let metrics = manager.metrics(ResourceKind::Texture);
/// println!("Hit rate: {:.2}%", metrics.hit_rate() * 100.0);
/// println!("Budget used: {:.2}%", metrics.utilization() * 100.0);
/// println!("Evictions: {}", metrics.evictions);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
	/// Requests answered from the cache, dedup hits included.
	pub hits: u64,
	/// Requests that had to call the backend.
	pub misses: u64,
	/// Memory loads answered through the content-hash index under a different key.
	pub dedup_hits: u64,
	/// Resources constructed and inserted.
	pub inserts: u64,
	/// Live entries removed to satisfy the budget.
	pub evictions: u64,
	/// Backend constructor failures.
	pub construction_failures: u64,
	/// Bytes held by live entries.
	pub current_size_bytes: u64,
	/// Configured budget in bytes (0 = unbounded).
	pub budget_bytes: u64,
	/// Number of live entries.
	pub entry_count: usize,
}

impl CacheMetrics {
	/// Ratio of hits to all requests, 0.0 when nothing was requested yet.
	pub fn hit_rate(&self) -> f64 {
		let total = self.total_requests();
		if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
	}

	/// Fraction of the budget in use, 0.0 for an unbounded budget.
	///
	/// Can exceed 1.0 when only critical entries remain.
	pub fn utilization(&self) -> f64 {
		if self.budget_bytes == 0 {
			0.0
		} else {
			self.current_size_bytes as f64 / self.budget_bytes as f64
		}
	}

	pub fn total_requests(&self) -> u64 {
		self.hits + self.misses
	}
}

/// Running counters kept inside a class's locked state.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
	pub hits: u64,
	pub misses: u64,
	pub dedup_hits: u64,
	pub inserts: u64,
	pub evictions: u64,
	pub construction_failures: u64,
}

impl Counters {
	pub fn snapshot(&self, current_size_bytes: u64, budget_bytes: u64, entry_count: usize) -> CacheMetrics {
		CacheMetrics {
			hits: self.hits,
			misses: self.misses,
			dedup_hits: self.dedup_hits,
			inserts: self.inserts,
			evictions: self.evictions,
			construction_failures: self.construction_failures,
			current_size_bytes,
			budget_bytes,
			entry_count,
		}
	}
}
