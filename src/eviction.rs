//! Victim selection under budget pressure.
//!
//! Candidates are ordered by `(priority, last_access)`: lowest tier first, oldest first within
//! a tier. Victims are taken from the front of that order until usage fits the budget.
//! [`Priority::Critical`] entries are never selected; if only they remain, the overage is
//! accepted and the plan reports `satisfied == false`.

use crate::traits::Priority;
use crate::weak_cache::ResourceInfo;

/// Outcome of [`EvictionPolicy::plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionPlan<K> {
	/// Keys to remove, in eviction order
	pub victims: Vec<K>,
	/// Bytes released by removing all victims
	pub freed_bytes: u64,
	/// Usage after the victims are gone
	pub remaining_bytes: u64,
	/// Whether `remaining_bytes` fits the budget (always true for an unbounded budget)
	pub satisfied: bool,
}

impl<K> EvictionPlan<K> {
	fn untouched(current_bytes: u64, satisfied: bool) -> Self {
		Self {
			victims: Vec::new(),
			freed_bytes: 0,
			remaining_bytes: current_bytes,
			satisfied,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.victims.is_empty()
	}
}

/// Priority-then-recency eviction ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvictionPolicy;

impl EvictionPolicy {
	/// Choose victims among `candidates` so that `current_bytes` drops to `budget_bytes`.
	///
	/// A budget of 0 means unbounded and never selects anything. `current_bytes` is passed in
	/// rather than summed from the candidates so callers can account for an entry that is
	/// about to be inserted.
	pub fn plan<'a, K, I>(&self, candidates: I, current_bytes: u64, budget_bytes: u64) -> EvictionPlan<K>
	where
		K: Clone + 'a,
		I: IntoIterator<Item = &'a ResourceInfo<K>>,
	{
		if budget_bytes == 0 || current_bytes <= budget_bytes {
			return EvictionPlan::untouched(current_bytes, true);
		}

		let mut ordered: Vec<&ResourceInfo<K>> =
			candidates.into_iter().filter(|info| info.priority != Priority::Critical).collect();
		ordered.sort_unstable_by_key(|info| (info.priority, info.last_access));

		let mut plan = EvictionPlan::untouched(current_bytes, false);
		for info in ordered {
			if plan.remaining_bytes <= budget_bytes {
				break;
			}
			plan.victims.push(info.key.clone());
			plan.freed_bytes = plan.freed_bytes.saturating_add(info.memory_size);
			plan.remaining_bytes = plan.remaining_bytes.saturating_sub(info.memory_size);
		}
		plan.satisfied = plan.remaining_bytes <= budget_bytes;
		plan
	}
}
