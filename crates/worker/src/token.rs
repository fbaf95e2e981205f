use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation handle for one action scheduled on a [`Timer`](crate::Timer).
///
/// Cloning shares the underlying token. Cancelling after the action has already run is a no-op.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
	cancel: CancellationToken,
}

impl TimerHandle {
	/// Creates a handle that is not cancelled.
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests cancellation; the action will not run if it has not started yet.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Returns true when cancellation was requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Converts the handle into a guard that cancels on drop.
	pub fn into_guard(self) -> TimerGuard {
		TimerGuard {
			_cancel_on_drop: self.cancel.drop_guard(),
		}
	}
}

/// Scope guard cancelling its scheduled action when dropped.
#[derive(Debug)]
pub struct TimerGuard {
	_cancel_on_drop: DropGuard,
}
