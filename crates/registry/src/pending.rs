//! Single-assignment result slots handed out by
//! [`CorrelationRegistry::create_pending`](crate::CorrelationRegistry::create_pending).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::{CorrelationId, TimeoutGuard};

/// Final outcome of a pending result. Real payloads and expiry travel through the same slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<T> {
	/// The transport delivered a reply.
	Resolved(T),
	/// No reply arrived before the timeout.
	TimedOut,
	/// The entry was cancelled or the registry went away.
	Cancelled,
}

impl<T> Settlement<T> {
	/// Returns the payload if the slot was resolved.
	pub fn ok(self) -> Option<T> {
		match self {
			Self::Resolved(value) => Some(value),
			Self::TimedOut | Self::Cancelled => None,
		}
	}

	/// Returns true for [`Settlement::Resolved`].
	pub fn is_resolved(&self) -> bool {
		matches!(self, Self::Resolved(_))
	}

	/// Returns true for [`Settlement::TimedOut`].
	pub fn is_timed_out(&self) -> bool {
		matches!(self, Self::TimedOut)
	}
}

/// Caller side of a pending result.
///
/// Await it (or call [`PendingResult::wait_blocking`] off-runtime) to observe the settlement.
/// A dropped handle does not remove the entry; the eventual settlement is discarded.
#[derive(Debug)]
#[must_use = "dropping the handle discards the reply"]
pub struct PendingResult<T> {
	id: CorrelationId,
	rx: oneshot::Receiver<Settlement<T>>,
}

impl<T> PendingResult<T> {
	pub(crate) fn new(id: CorrelationId, rx: oneshot::Receiver<Settlement<T>>) -> Self {
		Self { id, rx }
	}

	/// The correlation id the reply must carry.
	pub fn id(&self) -> CorrelationId {
		self.id
	}

	/// Returns the settlement if it has arrived, without waiting.
	///
	/// The settlement is handed out once; afterwards the handle reports
	/// [`Settlement::Cancelled`].
	pub fn try_settlement(&mut self) -> Option<Settlement<T>> {
		match self.rx.try_recv() {
			Ok(settlement) => Some(settlement),
			Err(oneshot::error::TryRecvError::Empty) => None,
			Err(oneshot::error::TryRecvError::Closed) => Some(Settlement::Cancelled),
		}
	}

	/// Blocks the current thread until settled.
	///
	/// # Panics
	///
	/// Panics when called from inside an async runtime, like
	/// [`oneshot::Receiver::blocking_recv`].
	pub fn wait_blocking(self) -> Settlement<T> {
		self.rx.blocking_recv().unwrap_or(Settlement::Cancelled)
	}
}

impl<T> Future for PendingResult<T> {
	type Output = Settlement<T>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.get_mut();
		Pin::new(&mut this.rx).poll(cx).map(|res| res.unwrap_or(Settlement::Cancelled))
	}
}

/// Registry side of a pending result, stored in the pending table.
///
/// Settling consumes the slot, so each slot settles at most once.
pub(crate) struct PendingSlot<T> {
	tx: oneshot::Sender<Settlement<T>>,
	pub(crate) guard: Option<TimeoutGuard>,
}

impl<T> PendingSlot<T> {
	pub(crate) fn channel(id: CorrelationId) -> (Self, PendingResult<T>) {
		let (tx, rx) = oneshot::channel();
		(Self { tx, guard: None }, PendingResult::new(id, rx))
	}

	/// Cancels the timeout (if any) and delivers `settlement`. Returns false when the caller
	/// already dropped its handle.
	pub(crate) fn settle(self, settlement: Settlement<T>) -> bool {
		if let Some(guard) = self.guard {
			guard.cancel();
		}
		self.tx.send(settlement).is_ok()
	}
}
