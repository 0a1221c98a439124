//! # Resource Cache
//!
//! A weak-reference resource cache with background loading, built for renderers that share
//! textures and models between many owners:
//! - **Load once** per distinct request (source + decode flags)
//! - **Weak ownership**: resources die when their last user drops them, not when the cache says so
//! - **Content deduplication** for in-memory sources that carry identical bytes under different names
//! - **Byte budgets** per resource class with priority-then-recency eviction
//! - **Asynchronous loading** on a dedicated pool of loader threads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resource_cache::{Priority, ResourceKind, ResourceManager, TextureFlags, TextureRequest};
//!
//! let manager = ResourceManager::builder()
//!     .texture_budget(512 * 1024 * 1024)
//!     .workers(4)
//!     .build(MyBackend::new())?;
//!
//! // Blocks the calling thread on a miss
//! let albedo = manager.load_texture(
//!     TextureRequest::path("textures/brick.png").with_flags(TextureFlags::color()),
//! )?;
//!
//! // Same request again: same Arc, no second decode
//! let again = manager.load_texture(
//!     TextureRequest::path("textures/brick.png").with_flags(TextureFlags::color()),
//! )?;
//! assert!(std::sync::Arc::ptr_eq(&albedo, &again));
//!
//! // Background load; the future is already complete if the texture is cached
//! let pending = manager.load_texture_async(
//!     TextureRequest::path("textures/sky.hdr").with_priority(Priority::High),
//! )?;
//! let sky = pending.wait()?;
//! ```
//!
//! ## Async Usage
//!
//! [`LoadFuture`] implements [`Future`](std::future::Future), so it can be awaited from any
//! executor. The load itself always runs on the manager's loader threads:
//!
//! ```rust,ignore
//! async fn stream_in(manager: &ResourceManager<MyBackend>) -> Result<(), ResourceError> {
//!     let model = manager.load_model_async(ModelRequest::path("ship.gltf"))?.await?;
//!     spawn_entity(model);
//!     Ok(())
//! }
//! ```
//!
//! ## Lifetimes
//!
//! The manager never keeps a resource alive. Entries whose resource has been dropped linger
//! until the next lookup of the same key or a call to
//! [`garbage_collect`](ResourceManager::garbage_collect):
//!
//! ```rust,ignore
//! drop(albedo);
//! drop(again);
//! assert_eq!(manager.garbage_collect(), 1);
//! ```

mod builder;
mod content;
mod error;
mod eviction;
mod future;
mod key;
mod manager;
#[cfg(feature = "metrics")]
mod metrics;
mod traits;
mod weak_cache;

pub use builder::ResourceManagerBuilder;
pub use content::{ContentHashIndex, ContentHasher, content_hash};
pub use error::ResourceError;
pub use eviction::{EvictionPlan, EvictionPolicy};
pub use future::LoadFuture;
pub use key::{LoadRequest, ModelFlags, ModelRequest, ResourceKey, ResourceSource, TextureFlags, TextureRequest};
pub use manager::ResourceManager;
#[cfg(feature = "metrics")]
pub use metrics::CacheMetrics;
pub use traits::{BoxError, Priority, Resource, ResourceBackend, ResourceKind};
pub use weak_cache::{ResourceInfo, WeakCache};
