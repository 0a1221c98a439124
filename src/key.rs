use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::content::{ContentHasher, content_hash};
use crate::traits::Priority;

/// Deterministic identity of a cached resource.
///
/// Built from the source and the decode flags: identical inputs always produce the same key,
/// and changing any flag produces a different one. Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(Arc<str>);

impl ResourceKey {
	/// `"path://{locator}?{flags}"`
	///
	/// Path and memory keys carry distinct schemes, so no locator can spell a memory key.
	pub fn from_path(locator: &str, flags: &impl fmt::Display) -> Self {
		Self(format!("path://{locator}?{flags}").into())
	}

	/// `"memory://{debug_name}#{digest}?{flags}"`
	///
	/// The content digest is part of the key, so reusing a debug name for different bytes
	/// never aliases the earlier resource.
	pub fn from_memory(debug_name: &str, digest: u64, flags: &impl fmt::Display) -> Self {
		Self(format!("memory://{debug_name}#{digest:016x}?{flags}").into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ResourceKey {
	fn from(key: &str) -> Self {
		Self(key.into())
	}
}

impl Borrow<str> for ResourceKey {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for ResourceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for ResourceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Decode options for textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureFlags {
	/// Treat color data as sRGB-encoded
	pub srgb: bool,
	/// Flip rows on upload
	pub flip_y: bool,
}

impl TextureFlags {
	/// Color texture: sRGB, no flip.
	pub const fn color() -> Self {
		Self {
			srgb: true,
			flip_y: false,
		}
	}

	/// Data texture (normals, roughness): linear, no flip.
	pub const fn linear() -> Self {
		Self {
			srgb: false,
			flip_y: false,
		}
	}
}

impl fmt::Display for TextureFlags {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "srgb={};flip_y={}", u8::from(self.srgb), u8::from(self.flip_y))
	}
}

/// Import options for models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModelFlags {
	pub flip_uvs: bool,
	pub generate_tangents: bool,
}

impl fmt::Display for ModelFlags {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"flip_uvs={};tangents={}",
			u8::from(self.flip_uvs),
			u8::from(self.generate_tangents)
		)
	}
}

/// Where a resource's bytes come from.
#[derive(Clone)]
pub enum ResourceSource {
	/// A locator handed to the backend as-is.
	Path(String),
	/// An encoded buffer already in memory.
	Memory {
		bytes: Arc<[u8]>,
		debug_name: String,
		/// FNV-1a of `bytes`, computed once when the source is built
		digest: u64,
	},
}

impl ResourceSource {
	pub fn path(locator: impl Into<String>) -> Self {
		Self::Path(locator.into())
	}

	pub fn memory(bytes: impl Into<Arc<[u8]>>, debug_name: impl Into<String>) -> Self {
		let bytes = bytes.into();
		let digest = content_hash(&bytes);
		Self::Memory {
			bytes,
			debug_name: debug_name.into(),
			digest,
		}
	}
}

impl fmt::Debug for ResourceSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Path(locator) => f.debug_tuple("Path").field(locator).finish(),
			Self::Memory {
				bytes,
				debug_name,
				digest,
			} => f
				.debug_struct("Memory")
				.field("len", &bytes.len())
				.field("debug_name", debug_name)
				.field("digest", &format_args!("{digest:016x}"))
				.finish(),
		}
	}
}

/// A load request: source, decode flags and retention tier.
///
/// # Example
///
/// ```
/// use resource_cache::{Priority, TextureFlags, TextureRequest};
///
/// let request = TextureRequest::path("textures/brick.png")
///     .with_flags(TextureFlags::color())
///     .with_priority(Priority::High);
///
/// assert_eq!(request.key().as_str(), "path://textures/brick.png?srgb=1;flip_y=0");
/// ```
#[derive(Debug, Clone)]
pub struct LoadRequest<F> {
	pub source: ResourceSource,
	pub flags: F,
	pub priority: Priority,
}

/// Texture load request.
pub type TextureRequest = LoadRequest<TextureFlags>;

/// Model load request.
pub type ModelRequest = LoadRequest<ModelFlags>;

impl<F: fmt::Display + Default> LoadRequest<F> {
	/// Request for a path source with default flags and [`Priority::Normal`].
	pub fn path(locator: impl Into<String>) -> Self {
		Self::new(ResourceSource::path(locator))
	}

	/// Request for an in-memory source with default flags and [`Priority::Normal`].
	pub fn memory(bytes: impl Into<Arc<[u8]>>, debug_name: impl Into<String>) -> Self {
		Self::new(ResourceSource::memory(bytes, debug_name))
	}

	pub fn new(source: ResourceSource) -> Self {
		Self {
			source,
			flags: F::default(),
			priority: Priority::default(),
		}
	}
}

impl<F: fmt::Display> LoadRequest<F> {
	pub fn with_flags(mut self, flags: F) -> Self {
		self.flags = flags;
		self
	}

	pub fn with_priority(mut self, priority: Priority) -> Self {
		self.priority = priority;
		self
	}

	/// Cache key for this request.
	pub fn key(&self) -> ResourceKey {
		match &self.source {
			ResourceSource::Path(locator) => ResourceKey::from_path(locator, &self.flags),
			ResourceSource::Memory {
				debug_name,
				digest,
				..
			} => ResourceKey::from_memory(debug_name, *digest, &self.flags),
		}
	}

	/// Digest used to collapse byte-identical memory loads, or `None` for path sources.
	///
	/// Covers the bytes and the flags, so the same buffer decoded two different ways is
	/// never collapsed. Resumes from the source digest instead of rehashing the bytes.
	pub fn dedup_digest(&self) -> Option<u64> {
		match &self.source {
			ResourceSource::Path(_) => None,
			ResourceSource::Memory {
				digest,
				..
			} => {
				let mut hasher = ContentHasher::resume(*digest);
				hasher.update(b"?").update(self.flags.to_string().as_bytes());
				Some(hasher.digest())
			}
		}
	}
}
