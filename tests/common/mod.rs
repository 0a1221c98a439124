//! Shared fake backend for the integration tests.
//!
//! Locator conventions:
//! - `missing*` fails with [`FakeError::NotFound`]
//! - anything containing `panic` panics inside the constructor
//! - anything containing `slow` sleeps for [`SLOW_LOAD`] before returning
//!
//! Footprints default to [`TEXTURE_BYTES`] / [`MODEL_BYTES`] and can be overridden per locator
//! with [`FakeBackend::with_size`]. Memory sources report their buffer length.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use resource_cache::{BoxError, ModelFlags, Resource, ResourceBackend, ResourceManager, TextureFlags};
use thiserror::Error;

pub const TEXTURE_BYTES: u64 = 100;
pub const MODEL_BYTES: u64 = 1000;
pub const SLOW_LOAD: Duration = Duration::from_millis(50);

/// Slot value of a resource that has not been registered yet.
pub const UNREGISTERED: u32 = u32::MAX;

#[derive(Debug, Error)]
pub enum FakeError {
	#[error("file not found: {0}")]
	NotFound(String),
}

#[derive(Debug)]
pub struct FakeTexture {
	pub name: String,
	pub bytes: u64,
	pub flags: TextureFlags,
	pub slot: AtomicU32,
}

impl Resource for FakeTexture {
	fn memory_footprint_bytes(&self) -> u64 {
		self.bytes
	}

	fn set_slot(&self, slot: u32) {
		self.slot.store(slot, Ordering::SeqCst);
	}
}

#[derive(Debug)]
pub struct FakeModel {
	pub name: String,
	pub bytes: u64,
	pub flags: ModelFlags,
	pub slot: AtomicU32,
}

impl Resource for FakeModel {
	fn memory_footprint_bytes(&self) -> u64 {
		self.bytes
	}

	fn set_slot(&self, slot: u32) {
		self.slot.store(slot, Ordering::SeqCst);
	}
}

#[derive(Default)]
pub struct FakeBackend {
	sizes: Mutex<HashMap<String, u64>>,
	pub texture_loads: AtomicUsize,
	pub model_loads: AtomicUsize,
	pub registrations: AtomicUsize,
	next_slot: AtomicU32,
}

impl FakeBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// Report `bytes` as the footprint of whatever `locator` loads to.
	pub fn with_size(self, locator: &str, bytes: u64) -> Self {
		self.sizes.lock().insert(locator.to_string(), bytes);
		self
	}

	pub fn texture_loads(&self) -> usize {
		self.texture_loads.load(Ordering::SeqCst)
	}

	pub fn model_loads(&self) -> usize {
		self.model_loads.load(Ordering::SeqCst)
	}

	pub fn registrations(&self) -> usize {
		self.registrations.load(Ordering::SeqCst)
	}

	fn open(&self, locator: &str, default_bytes: u64) -> Result<u64, BoxError> {
		if locator.contains("panic") {
			panic!("decoder crashed on {locator}");
		}
		if locator.contains("slow") {
			thread::sleep(SLOW_LOAD);
		}
		if locator.starts_with("missing") {
			return Err(FakeError::NotFound(locator.to_string()).into());
		}
		Ok(self.sizes.lock().get(locator).copied().unwrap_or(default_bytes))
	}

	fn register(&self) -> u32 {
		self.registrations.fetch_add(1, Ordering::SeqCst);
		self.next_slot.fetch_add(1, Ordering::SeqCst)
	}
}

impl ResourceBackend for FakeBackend {
	type Texture = FakeTexture;
	type Model = FakeModel;

	fn load_texture(&self, path: &str, flags: TextureFlags) -> Result<FakeTexture, BoxError> {
		self.texture_loads.fetch_add(1, Ordering::SeqCst);
		let bytes = self.open(path, TEXTURE_BYTES)?;
		Ok(FakeTexture {
			name: path.to_string(),
			bytes,
			flags,
			slot: AtomicU32::new(UNREGISTERED),
		})
	}

	fn load_texture_from_memory(
		&self,
		bytes: &[u8],
		debug_name: &str,
		flags: TextureFlags,
	) -> Result<FakeTexture, BoxError> {
		self.texture_loads.fetch_add(1, Ordering::SeqCst);
		self.open(debug_name, 0)?;
		Ok(FakeTexture {
			name: debug_name.to_string(),
			bytes: bytes.len() as u64,
			flags,
			slot: AtomicU32::new(UNREGISTERED),
		})
	}

	fn load_model(&self, path: &str, flags: ModelFlags) -> Result<FakeModel, BoxError> {
		self.model_loads.fetch_add(1, Ordering::SeqCst);
		let bytes = self.open(path, MODEL_BYTES)?;
		Ok(FakeModel {
			name: path.to_string(),
			bytes,
			flags,
			slot: AtomicU32::new(UNREGISTERED),
		})
	}

	fn load_model_from_memory(
		&self,
		bytes: &[u8],
		debug_name: &str,
		flags: ModelFlags,
	) -> Result<FakeModel, BoxError> {
		self.model_loads.fetch_add(1, Ordering::SeqCst);
		self.open(debug_name, 0)?;
		Ok(FakeModel {
			name: debug_name.to_string(),
			bytes: bytes.len() as u64,
			flags,
			slot: AtomicU32::new(UNREGISTERED),
		})
	}

	fn register_texture(&self, _texture: &Arc<FakeTexture>) -> u32 {
		self.register()
	}

	fn register_model(&self, _model: &Arc<FakeModel>) -> u32 {
		self.register()
	}
}

/// Manager with two loader threads and unbounded budgets.
pub fn manager(backend: FakeBackend) -> ResourceManager<FakeBackend> {
	ResourceManager::<FakeBackend>::builder().workers(2).build(backend).expect("manager should build")
}
