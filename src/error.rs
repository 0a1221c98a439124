use thiserror::Error;

use crate::key::ResourceKey;
use crate::traits::{BoxError, ResourceKind};

/// Errors surfaced by [`ResourceManager`](crate::ResourceManager).
///
/// Bookkeeping problems (stale entries, dangling content-index mappings) are repaired
/// internally and never show up here. A budget that cannot be met because only
/// [`Critical`](crate::Priority::Critical) entries remain is not an error either; it is
/// visible through [`memory_usage`](crate::ResourceManager::memory_usage).
#[derive(Debug, Error)]
pub enum ResourceError {
	/// The backend failed to build the resource. The cache was left untouched.
	///
	/// `source` is exactly what the backend returned and can be downcast to its concrete type.
	#[error("failed to load {kind} `{key}`")]
	Construction {
		kind: ResourceKind,
		key: ResourceKey,
		#[source]
		source: BoxError,
	},

	/// The backend panicked while building the resource on a loader thread.
	#[error("loader task for {kind} `{key}` panicked: {message}")]
	TaskPanicked {
		kind: ResourceKind,
		key: ResourceKey,
		message: String,
	},

	/// The loader task went away without producing a result.
	#[error("loader task for {kind} `{key}` ended without a result")]
	TaskAbandoned { kind: ResourceKind, key: ResourceKey },

	/// An asynchronous load was requested after [`shutdown`](crate::ResourceManager::shutdown).
	#[error("resource manager is shutting down")]
	ShutdownInProgress,

	/// A loader thread could not be spawned.
	#[error("failed to spawn loader threads")]
	WorkerSpawn(#[source] std::io::Error),
}

impl ResourceError {
	/// The backend's own error, for [`Construction`](ResourceError::Construction) failures.
	pub fn construction_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
		match self {
			ResourceError::Construction {
				source,
				..
			} => Some(source.as_ref()),
			_ => None,
		}
	}

	/// Key of the resource the error refers to, if any.
	pub fn key(&self) -> Option<&ResourceKey> {
		match self {
			ResourceError::Construction {
				key,
				..
			}
			| ResourceError::TaskPanicked {
				key,
				..
			}
			| ResourceError::TaskAbandoned {
				key,
				..
			} => Some(key),
			ResourceError::ShutdownInProgress | ResourceError::WorkerSpawn(_) => None,
		}
	}
}
