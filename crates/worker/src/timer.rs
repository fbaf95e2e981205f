use std::time::Duration;

use crate::TimerHandle;

/// Deferred action run at most once by a [`Timer`].
pub type TimerAction = Box<dyn FnOnce() + Send + 'static>;

/// Facility that runs an action after a delay unless cancelled first.
///
/// Scheduling precision is implementation-defined. Implementations must never run a cancelled
/// action that had not started yet, and must never block the caller of [`Timer::schedule`].
pub trait Timer: Send + Sync + 'static {
	/// Schedules `action` to run once `after` has elapsed.
	fn schedule(&self, after: Duration, action: TimerAction) -> TimerHandle;
}

/// [`Timer`] backed by `tokio::time::sleep` in a spawned task.
///
/// Each scheduled action owns one lightweight task that races the sleep against its
/// cancellation token, so a cancelled timer releases its task immediately. If the runtime drops
/// the task before it fires (runtime shutdown), the action runs on drop unless it was cancelled,
/// so a deadline is never silently lost.
#[derive(Debug, Clone, Default)]
pub struct TokioTimer {
	runtime: Option<tokio::runtime::Handle>,
}

impl TokioTimer {
	/// Creates a timer that spawns onto the runtime current at each `schedule` call (or the global
	/// fallback).
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a timer pinned to the process-wide runtime from [`global_handle`](crate::global_handle).
	pub fn global() -> Self {
		Self::with_runtime(crate::global_handle())
	}

	/// Creates a timer pinned to `runtime`.
	pub fn with_runtime(runtime: tokio::runtime::Handle) -> Self {
		Self { runtime: Some(runtime) }
	}
}

impl Timer for TokioTimer {
	fn schedule(&self, after: Duration, action: TimerAction) -> TimerHandle {
		let handle = TimerHandle::new();
		let token = handle.clone();
		let mut armed = Armed {
			action: Some(action),
			handle: handle.clone(),
		};
		let fut = async move {
			tokio::select! {
				biased;

				() = token.cancelled() => {
					tracing::trace!("worker.timer.cancelled");
				}
				() = tokio::time::sleep(after) => {
					tracing::trace!(after_ms = after.as_millis() as u64, "worker.timer.fire");
					armed.fire();
				}
			}
		};

		match &self.runtime {
			Some(runtime) => {
				runtime.spawn(fut);
			}
			None => {
				crate::spawn("timer", fut);
			}
		}
		handle
	}
}

/// Action owned by a timer task. Runs on drop if the task dies before firing or cancellation.
struct Armed {
	action: Option<TimerAction>,
	handle: TimerHandle,
}

impl Armed {
	fn fire(&mut self) {
		if let Some(action) = self.action.take() {
			action();
		}
	}
}

impl Drop for Armed {
	fn drop(&mut self) {
		if self.action.is_some() && !self.handle.is_cancelled() {
			tracing::debug!("worker.timer.orphaned");
			self.fire();
		}
	}
}
