use std::time::Duration;

use courier_worker::{Timer, TimerAction, TimerGuard};

use crate::CorrelationId;

/// Expiry action bound to one pending id.
///
/// Stored alongside the pending slot; settling the slot cancels the guard, and dropping it
/// cancels as well. Whether the reply or the expiry wins is decided by which one removes the
/// entry from the pending table first, so a guard that fires late finds nothing to settle.
#[derive(Debug)]
pub struct TimeoutGuard {
	timer: TimerGuard,
}

impl TimeoutGuard {
	pub(crate) fn schedule(timer: &dyn Timer, id: CorrelationId, after: Duration, action: TimerAction) -> Self {
		tracing::trace!(id = id.get(), after_ms = after.as_millis() as u64, "registry.timeout.arm");
		Self {
			timer: timer.schedule(after, action).into_guard(),
		}
	}

	/// Cancels the expiry. A no-op if it already fired.
	pub fn cancel(self) {
		drop(self.timer);
	}
}
