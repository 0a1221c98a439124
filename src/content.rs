//! Content hashing for memory-sourced loads.
//!
//! Embedded assets (glTF images, packed archives) frequently carry the same bytes under
//! different synthetic names. Hashing the bytes lets the cache decode each distinct payload
//! once, whatever the caller chose to call it.

use std::hash::Hasher;

use ahash::RandomState;
use hashbrown::HashMap;

use crate::key::ResourceKey;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Streaming 64-bit FNV-1a.
///
/// Stable across runs, platforms and process restarts, unlike the randomly seeded hashers
/// used for the cache maps.
#[derive(Debug, Clone, Copy)]
pub struct ContentHasher {
	state: u64,
}

impl ContentHasher {
	pub const fn new() -> Self {
		Self {
			state: FNV_OFFSET_BASIS,
		}
	}

	/// Continue hashing from a digest produced earlier.
	///
	/// `resume(content_hash(a)).update(b)` equals `content_hash(a ++ b)`.
	pub const fn resume(digest: u64) -> Self {
		Self {
			state: digest,
		}
	}

	/// Feed more bytes into the digest.
	pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
		for byte in bytes {
			self.state ^= u64::from(*byte);
			self.state = self.state.wrapping_mul(FNV_PRIME);
		}
		self
	}

	pub const fn digest(&self) -> u64 {
		self.state
	}
}

impl Default for ContentHasher {
	fn default() -> Self {
		Self::new()
	}
}

impl Hasher for ContentHasher {
	fn finish(&self) -> u64 {
		self.state
	}

	fn write(&mut self, bytes: &[u8]) {
		self.update(bytes);
	}
}

/// FNV-1a digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> u64 {
	ContentHasher::new().update(bytes).digest()
}

/// Maps a content digest to the key of the entry that was built from that content.
///
/// Entries may outlive the cache entry they point at; lookups that find a dead target simply
/// drop the mapping.
#[derive(Debug, Default)]
pub struct ContentHashIndex {
	keys: HashMap<u64, ResourceKey, RandomState>,
}

impl ContentHashIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, digest: u64) -> Option<&ResourceKey> {
		self.keys.get(&digest)
	}

	pub fn insert(&mut self, digest: u64, key: ResourceKey) -> Option<ResourceKey> {
		self.keys.insert(digest, key)
	}

	pub fn remove(&mut self, digest: u64) -> Option<ResourceKey> {
		self.keys.remove(&digest)
	}

	/// Keep only mappings whose key satisfies `keep`. Returns how many were dropped.
	pub fn retain_keys(&mut self, mut keep: impl FnMut(&ResourceKey) -> bool) -> usize {
		let before = self.keys.len();
		self.keys.retain(|_, key| keep(key));
		before - self.keys.len()
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}
}
