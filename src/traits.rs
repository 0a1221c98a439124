use std::fmt;
use std::sync::Arc;

use crate::key::{ModelFlags, TextureFlags};

/// Opaque failure produced by a backend constructor.
///
/// The cache never inspects it; it is handed back to the caller unchanged inside
/// [`ResourceError::Construction`](crate::ResourceError::Construction).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Retention tier of a cached resource.
///
/// Lower tiers are evicted first. [`Priority::Critical`] entries are never evicted, even if
/// that leaves the class over its memory budget.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
	/// Easily reloaded data (distant LODs, prefetch). First to be evicted.
	Low = 0,

	/// Ordinary assets.
	#[default]
	Normal = 1,

	/// Assets that are expensive to reload or currently on screen.
	High = 2,

	/// Never evicted (UI atlases, fallback textures, the player model).
	Critical = 3,
}

/// A disjoint resource category with its own cache, lock and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Texture,
	Model,
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResourceKind::Texture => f.write_str("texture"),
			ResourceKind::Model => f.write_str("model"),
		}
	}
}

/// A reference-counted GPU-facing resource the cache can track.
pub trait Resource: Send + Sync + 'static {
	/// Bytes this resource occupies. Queried once after construction.
	fn memory_footprint_bytes(&self) -> u64;

	/// Remember the slot handed out by the registrar.
	///
	/// Called exactly once, right after the resource enters the cache. Resources live behind
	/// an `Arc`, so implementations need interior mutability (an `AtomicU32` is enough).
	fn set_slot(&self, slot: u32);
}

/// The external collaborators of the cache: decoders, GPU upload and the slot registry.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// use resource_cache::{BoxError, ModelFlags, Resource, ResourceBackend, TextureFlags};
///
/// struct Blob {
///     bytes: u64,
///     slot: AtomicU32,
/// }
///
/// impl Resource for Blob {
///     fn memory_footprint_bytes(&self) -> u64 {
///         self.bytes
///     }
///
///     fn set_slot(&self, slot: u32) {
///         self.slot.store(slot, Ordering::Relaxed);
///     }
/// }
///
/// struct Backend {
///     next_slot: AtomicU32,
/// }
///
/// impl ResourceBackend for Backend {
///     type Texture = Blob;
///     type Model = Blob;
///
///     fn load_texture(&self, _path: &str, _flags: TextureFlags) -> Result<Blob, BoxError> {
///         Ok(Blob { bytes: 4096, slot: AtomicU32::new(0) })
///     }
///
///     fn load_texture_from_memory(
///         &self,
///         bytes: &[u8],
///         _debug_name: &str,
///         _flags: TextureFlags,
///     ) -> Result<Blob, BoxError> {
///         Ok(Blob { bytes: bytes.len() as u64, slot: AtomicU32::new(0) })
///     }
///
///     fn load_model(&self, _path: &str, _flags: ModelFlags) -> Result<Blob, BoxError> {
///         Err("models are not supported".into())
///     }
///
///     fn load_model_from_memory(
///         &self,
///         _bytes: &[u8],
///         _debug_name: &str,
///         _flags: ModelFlags,
///     ) -> Result<Blob, BoxError> {
///         Err("models are not supported".into())
///     }
///
///     fn register_texture(&self, _texture: &Arc<Blob>) -> u32 {
///         self.next_slot.fetch_add(1, Ordering::Relaxed)
///     }
///
///     fn register_model(&self, _model: &Arc<Blob>) -> u32 {
///         0
///     }
/// }
/// ```
pub trait ResourceBackend: Send + Sync + 'static {
	type Texture: Resource;
	type Model: Resource;

	/// Decode and upload a texture from a source locator.
	fn load_texture(&self, path: &str, flags: TextureFlags) -> Result<Self::Texture, BoxError>;

	/// Decode and upload a texture from an in-memory encoded image.
	fn load_texture_from_memory(
		&self,
		bytes: &[u8],
		debug_name: &str,
		flags: TextureFlags,
	) -> Result<Self::Texture, BoxError>;

	/// Load a model from a source locator.
	fn load_model(&self, path: &str, flags: ModelFlags) -> Result<Self::Model, BoxError>;

	/// Load a model from an in-memory buffer.
	fn load_model_from_memory(
		&self,
		bytes: &[u8],
		debug_name: &str,
		flags: ModelFlags,
	) -> Result<Self::Model, BoxError>;

	/// Register a freshly cached texture with the rendering side and return its slot.
	fn register_texture(&self, texture: &Arc<Self::Texture>) -> u32;

	/// Register a freshly cached model with the rendering side and return its slot.
	fn register_model(&self, model: &Arc<Self::Model>) -> u32;
}
