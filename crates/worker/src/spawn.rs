use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

/// Returns the ambient Tokio runtime handle, falling back to a lazily built global runtime when
/// called from a thread that is not inside one.
pub fn runtime_handle() -> tokio::runtime::Handle {
	match tokio::runtime::Handle::try_current() {
		Ok(handle) => handle,
		Err(_) => global_handle(),
	}
}

/// Handle to the process-wide fallback runtime. It lives until the process exits, so work spawned
/// here outlives any runtime the caller happens to be running on.
pub fn global_handle() -> tokio::runtime::Handle {
	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("courier-worker-global")
			.build()
			.expect("failed to build courier-worker global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task on [`runtime_handle`].
pub fn spawn<F>(label: &'static str, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(task = label, "worker.spawn");
	runtime_handle().spawn(fut)
}
