//! Awaiting load futures from an async runtime.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeBackend, manager};
use resource_cache::{ModelRequest, ResourceError, ResourceKind, TextureRequest};

#[tokio::test]
async fn test_await_async_load() {
	let manager = manager(FakeBackend::new());

	let texture = manager
		.load_texture_async(TextureRequest::path("slow_await.png"))
		.expect("submit should succeed")
		.await
		.expect("load should succeed");

	assert_eq!(texture.name, "slow_await.png");
	assert_eq!(manager.cached_count(ResourceKind::Texture), 1);
}

#[tokio::test]
async fn test_await_cached_resolves_without_worker() {
	let manager = manager(FakeBackend::new());
	let model = manager.load_model(ModelRequest::path("ship.gltf")).expect("load should succeed");

	let future = manager.load_model_async(ModelRequest::path("ship.gltf")).expect("fast path");
	assert!(future.is_ready());

	let awaited = future.await.expect("load should succeed");
	assert!(Arc::ptr_eq(&model, &awaited));
	assert_eq!(manager.backend().model_loads(), 1);
}

#[tokio::test]
async fn test_await_failure() {
	let manager = manager(FakeBackend::new());

	let result = manager
		.load_texture_async(TextureRequest::path("missing.png"))
		.expect("submit should succeed")
		.await;
	assert!(matches!(result, Err(ResourceError::Construction { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_join_many_loads() {
	let manager = Arc::new(manager(FakeBackend::new()));

	let tasks: Vec<_> = (0..6)
		.map(|i| {
			let future = manager
				.load_texture_async(TextureRequest::path(format!("slow_{}.png", i % 3)))
				.expect("submit should succeed");
			tokio::spawn(future)
		})
		.collect();

	let mut loaded = Vec::new();
	for task in tasks {
		loaded.push(task.await.expect("task should not panic").expect("load should succeed"));
	}

	// Six requests over three keys: every key constructed exactly once.
	assert_eq!(manager.backend().texture_loads(), 3);
	for i in 0..3 {
		assert!(Arc::ptr_eq(&loaded[i], &loaded[i + 3]));
	}
}

#[tokio::test]
async fn test_hold_resource_across_await() {
	let manager = manager(FakeBackend::new());
	let texture = manager.load_texture(TextureRequest::path("held.png")).expect("load should succeed");

	tokio::time::sleep(Duration::from_millis(1)).await;

	assert_eq!(manager.cached_count(ResourceKind::Texture), 1);
	drop(texture);
	assert_eq!(manager.garbage_collect(), 1);
}
